use std::io;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Represents the outer-level, user-facing errors of the warp-router execution package.
///
/// Every variant is fatal for the top-level call that produced it: the router rolls back all the
/// effects of the call before returning the error.
/// Variants:
/// - `Decode`: The payload is malformed or too short for the selected adapter.
/// - `UnsupportedAdapter`: The command selector has no registered handler.
/// - `Slippage`: The realized output is below the instruction's declared minimum.
/// - `ExternalFailure`: The called protocol (or token) reverted.
/// - `Unauthorized`: An administrative operation was invoked by a caller lacking the role.
/// - `InvalidInput`: The instructions are well-formed but cannot be executed together (e.g. a
///   chained output that no instruction consumes).
/// - `FatalError`: There is a problem with the router setup.
#[derive(Error, Debug, PartialEq)]
pub enum ExecutionError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Unsupported adapter: {0:#04x}")]
    UnsupportedAdapter(u8),
    #[error("Slippage: received {amount_out}, expected at least {amount_out_min}")]
    Slippage { amount_out: U256, amount_out_min: U256 },
    #[error("External call to {target} failed: {reason}")]
    ExternalFailure { target: Address, reason: String },
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Fatal error: {0}")]
    FatalError(String),
}

impl From<io::Error> for ExecutionError {
    fn from(err: io::Error) -> Self {
        ExecutionError::FatalError(err.to_string())
    }
}

impl From<serde_json::Error> for ExecutionError {
    fn from(err: serde_json::Error) -> Self {
        ExecutionError::FatalError(err.to_string())
    }
}
