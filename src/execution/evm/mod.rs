pub mod adapters;
pub mod address_table;
pub mod constants;
pub mod host;
pub mod router;
pub mod router_builder;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;
