use alloy_primitives::Address;
use tracing::info;

use crate::execution::{
    errors::ExecutionError,
    evm::{
        adapters::adapter_registry::AdapterRegistry, address_table::AddressTable,
        router::WarpRouter,
    },
    ledger::FeeLedger,
    models::Chain,
};

/// Builder pattern for constructing a `WarpRouter` with customizable options.
///
/// The chain, the router address and the owner are required; everything else has a default.
pub struct WarpRouterBuilder {
    chain: Option<Chain>,
    addresses_file_path: Option<String>,
    address_table: Option<AddressTable>,
    router_address: Option<Address>,
    owner: Option<Address>,
    protocol_fee_bps: u16,
    partners: Vec<(Address, u16)>,
}

impl Default for WarpRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WarpRouterBuilder {
    pub fn new() -> Self {
        WarpRouterBuilder {
            chain: None,
            addresses_file_path: None,
            address_table: None,
            router_address: None,
            owner: None,
            protocol_fee_bps: 0,
            partners: Vec::new(),
        }
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Sets the `addresses_file_path` manually.
    /// If it's not set, the default table will be used (config/router_addresses.json)
    pub fn addresses_file_path(mut self, addresses_file_path: String) -> Self {
        self.addresses_file_path = Some(addresses_file_path);
        self
    }

    /// Uses `table` instead of loading one. Takes precedence over `addresses_file_path`.
    pub fn address_table(mut self, table: AddressTable) -> Self {
        self.address_table = Some(table);
        self
    }

    pub fn router_address(mut self, router_address: Address) -> Self {
        self.router_address = Some(router_address);
        self
    }

    pub fn owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn protocol_fee_bps(mut self, protocol_fee_bps: u16) -> Self {
        self.protocol_fee_bps = protocol_fee_bps;
        self
    }

    /// Registers a partner from the start.
    pub fn partner(mut self, partner: Address, fee_bps: u16) -> Self {
        self.partners.push((partner, fee_bps));
        self
    }

    /// Builds the `WarpRouter` instance using the configured options.
    /// Returns an error if the chain, router address or owner has not been set.
    pub fn build(self) -> Result<WarpRouter, ExecutionError> {
        let (Some(chain), Some(router_address), Some(owner)) =
            (self.chain, self.router_address, self.owner)
        else {
            return Err(ExecutionError::FatalError(
                "Please set the chain, router address and owner before building the router"
                    .to_string(),
            ));
        };
        let table = match self.address_table {
            Some(table) => table,
            None => AddressTable::load(self.addresses_file_path.as_deref(), chain)?,
        };
        let registry = AdapterRegistry::new(&table)?;
        let mut ledger = FeeLedger::new(self.protocol_fee_bps)?;
        for (partner, fee_bps) in self.partners {
            ledger.register_partner(partner, fee_bps)?;
        }
        info!(
            %chain,
            router = %router_address,
            adapters = ?registry.supported(),
            protocol_fee_bps = self.protocol_fee_bps,
            "Router built"
        );
        Ok(WarpRouter::new(chain, router_address, owner, table.wrapped_native, registry, ledger))
    }
}
