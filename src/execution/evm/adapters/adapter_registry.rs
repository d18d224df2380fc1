use std::collections::HashMap;

use crate::execution::{
    command::AdapterId,
    errors::ExecutionError,
    evm::{
        adapters::{builder::AdapterBuilder, Adapter},
        address_table::AddressTable,
    },
};

/// Registry containing the `Adapter` of every family configured for a chain.
///
/// Built once from the address table and never modified afterwards.
pub struct AdapterRegistry {
    adapters: HashMap<AdapterId, Box<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new(table: &AddressTable) -> Result<Self, ExecutionError> {
        let mut adapters = HashMap::new();
        for id in table.configured_adapters() {
            let adapter = AdapterBuilder::new(id, table.addresses(id)).build()?;
            adapters.insert(id, adapter);
        }
        Ok(Self { adapters })
    }

    /// Looks up the handler of a raw command selector.
    pub fn get(&self, selector: u8) -> Result<&dyn Adapter, ExecutionError> {
        AdapterId::try_from(selector)
            .ok()
            .and_then(|id| self.adapters.get(&id))
            .map(|adapter| adapter.as_ref())
            .ok_or(ExecutionError::UnsupportedAdapter(selector))
    }

    pub fn supported(&self) -> Vec<AdapterId> {
        let mut ids: Vec<AdapterId> = self.adapters.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::execution::models::Chain;

    #[rstest]
    #[case(0x01, true)]
    #[case(0x03, true)]
    #[case(0x13, true)]
    #[case(0x05, false)]
    #[case(0x3f, false)]
    fn test_lookup_by_selector(#[case] selector: u8, #[case] registered: bool) {
        let table = AddressTable::load(None, Chain::Ethereum).unwrap();
        let registry = AdapterRegistry::new(&table).unwrap();
        match registry.get(selector) {
            Ok(adapter) => {
                assert!(registered);
                assert_eq!(adapter.id() as u8, selector);
            }
            Err(err) => {
                assert!(!registered);
                assert_eq!(err, ExecutionError::UnsupportedAdapter(selector));
            }
        }
    }

    #[test]
    fn test_unconfigured_family_is_unsupported() {
        let table = AddressTable::load(None, Chain::Arbitrum).unwrap();
        let registry = AdapterRegistry::new(&table).unwrap();
        assert!(!registry
            .supported()
            .contains(&AdapterId::Hop));
        assert!(matches!(
            registry.get(AdapterId::Hop as u8),
            Err(ExecutionError::UnsupportedAdapter(0x13))
        ));
    }
}
