use alloy_primitives::Address;

use crate::execution::{
    command::AdapterId,
    errors::ExecutionError,
    evm::adapters::{
        bridge_adapters::{AcrossAdapter, CelerAdapter, HopAdapter, StargateAdapter},
        swap_adapters::{
            ConcentratedLiquidityAdapter, GenericAmmAdapter, StableswapAdapter,
            WeightedPoolAdapter,
        },
        Adapter,
    },
};

/// Builds an `Adapter` for the given family and its configured entry points.
pub struct AdapterBuilder {
    adapter: AdapterId,
    entry_points: Vec<Address>,
}

impl AdapterBuilder {
    pub fn new(adapter: AdapterId, entry_points: &[Address]) -> Self {
        AdapterBuilder { adapter, entry_points: entry_points.to_vec() }
    }

    pub fn build(self) -> Result<Box<dyn Adapter>, ExecutionError> {
        // Stableswap pools are named by the payload; every other family needs an entry point.
        if self.entry_points.is_empty() && self.adapter != AdapterId::Stableswap {
            return Err(ExecutionError::FatalError(format!(
                "No entry points configured for adapter {}",
                self.adapter
            )));
        }
        let entry_points = self.entry_points;
        Ok(match self.adapter {
            AdapterId::GenericAmm => Box::new(GenericAmmAdapter::new(entry_points)),
            AdapterId::ConcentratedLiquidity => {
                Box::new(ConcentratedLiquidityAdapter::new(entry_points))
            }
            AdapterId::Stableswap => Box::new(StableswapAdapter::new()),
            AdapterId::WeightedPool => Box::new(WeightedPoolAdapter::new(entry_points)),
            AdapterId::Across => Box::new(AcrossAdapter::new(entry_points)),
            AdapterId::Celer => Box::new(CelerAdapter::new(entry_points)),
            AdapterId::Stargate => Box::new(StargateAdapter::new(entry_points)),
            AdapterId::Hop => Box::new(HopAdapter::new(entry_points)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_every_family() {
        for id in AdapterId::ALL {
            let adapter = AdapterBuilder::new(id, &[Address::repeat_byte(0x01)])
                .build()
                .unwrap();
            assert_eq!(adapter.id(), id);
        }
    }

    #[test]
    fn test_missing_entry_points() {
        assert!(AdapterBuilder::new(AdapterId::Across, &[])
            .build()
            .is_err());
        assert!(AdapterBuilder::new(AdapterId::Stableswap, &[])
            .build()
            .is_ok());
    }
}
