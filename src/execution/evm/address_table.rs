use std::{collections::HashMap, fs};

use alloy_primitives::Address;
use serde::Deserialize;

use crate::execution::{
    command::AdapterId, errors::ExecutionError, evm::constants::DEFAULT_ADDRESSES_JSON,
    models::Chain,
};

/// External entry points for one chain, fixed once the router is built.
///
/// Each adapter family owns a list of addresses; the first routing byte of a command indexes into
/// it (which DEX fork, which vault, which bridge asset variant).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AddressTable {
    pub wrapped_native: Address,
    #[serde(default)]
    adapters: HashMap<String, Vec<Address>>,
}

impl AddressTable {
    pub fn new(wrapped_native: Address) -> Self {
        Self { wrapped_native, adapters: HashMap::new() }
    }

    /// Loads the table for `chain` from the JSON file at `path`, or from the embedded default.
    pub fn load(path: Option<&str>, chain: Chain) -> Result<Self, ExecutionError> {
        let config_str = if let Some(path) = path {
            fs::read_to_string(path).map_err(|e| {
                ExecutionError::FatalError(format!(
                    "Error reading addresses file from {:?}: {}",
                    path, e
                ))
            })?
        } else {
            DEFAULT_ADDRESSES_JSON.to_string()
        };
        let mut tables: HashMap<String, AddressTable> = serde_json::from_str(&config_str)?;
        let table = tables.remove(chain.name()).ok_or_else(|| {
            ExecutionError::FatalError(format!("No addresses found for chain {}", chain))
        })?;
        if let Some(unknown) = table
            .adapters
            .keys()
            .find(|name| AdapterId::from_name(name).is_none())
        {
            return Err(ExecutionError::FatalError(format!(
                "Unknown adapter family in address table: {}",
                unknown
            )));
        }
        Ok(table)
    }

    pub fn with_adapter(mut self, adapter: AdapterId, addresses: Vec<Address>) -> Self {
        self.adapters
            .insert(adapter.name().to_string(), addresses);
        self
    }

    /// Families with an entry in the table, in selector order.
    pub fn configured_adapters(&self) -> Vec<AdapterId> {
        AdapterId::ALL
            .into_iter()
            .filter(|id| self.adapters.contains_key(id.name()))
            .collect()
    }

    pub fn addresses(&self, adapter: AdapterId) -> &[Address] {
        self.adapters
            .get(adapter.name())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_load_default_ethereum_table() {
        let table = AddressTable::load(None, Chain::Ethereum).unwrap();
        assert_eq!(
            table.wrapped_native,
            Address::from_str("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap()
        );
        assert_eq!(
            table.addresses(AdapterId::GenericAmm)[1],
            Address::from_str("0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F").unwrap()
        );
        assert_eq!(table.configured_adapters().len(), AdapterId::ALL.len());
    }

    #[test]
    fn test_hop_is_not_configured_on_arbitrum() {
        let table = AddressTable::load(None, Chain::Arbitrum).unwrap();
        assert!(!table
            .configured_adapters()
            .contains(&AdapterId::Hop));
        assert!(table
            .addresses(AdapterId::Hop)
            .is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = AddressTable::load(Some("does/not/exist.json"), Chain::Ethereum);
        assert!(matches!(result, Err(ExecutionError::FatalError(_))));
    }
}
