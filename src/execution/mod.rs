pub mod codec;
pub mod command;
pub mod errors;
pub mod evm;
pub mod ledger;
pub mod models;
mod serde_primitives;
