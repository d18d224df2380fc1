use std::{fmt, str::FromStr};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::execution::{
    command::AdapterId,
    errors::ExecutionError,
    serde_primitives::{u256_string, u256_string_option},
};

/// Chains with a shipped address table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Arbitrum,
}

impl Chain {
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Arbitrum => 42161,
        }
    }
}

impl FromStr for Chain {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" => Ok(Chain::Ethereum),
            "arbitrum" => Ok(Chain::Arbitrum),
            other => Err(ExecutionError::InvalidInput(format!("Unsupported chain: {}", other))),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The caller-side envelope of a top-level call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Address of the caller; input assets are pulled from it and, by default, outputs go to it.
    pub sender: Address,
    /// Native currency attached to the call.
    pub value: U256,
    /// Integrator credited with the partner share of the fees, if any.
    pub partner: Option<Address>,
}

impl Invocation {
    pub fn new(sender: Address) -> Self {
        Self { sender, value: U256::ZERO, partner: None }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_partner(mut self, partner: Address) -> Self {
        self.partner = Some(partner);
        self
    }
}

/// The output of a chained instruction, replacing the amount-in of the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountOverride {
    pub asset: Address,
    pub amount: U256,
}

/// What an adapter produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Outcome {
    /// The router now holds `amount_out` of `asset_out`.
    Swapped {
        asset_out: Address,
        #[serde(with = "u256_string")]
        amount_out: U256,
    },
    /// The input left custody towards another chain; nothing comes back.
    Bridged,
}

/// Structured records consumed by the indexing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RouterEvent {
    /// A completed swap. `amount_out` is the amount delivered after fees.
    Warp {
        asset_in: Address,
        asset_out: Address,
        #[serde(with = "u256_string")]
        amount_in: U256,
        #[serde(with = "u256_string")]
        amount_out: U256,
    },
    /// Fees taken from a swap output. `partner` is the zero address when no partner was credited.
    Fee {
        asset: Address,
        partner: Address,
        #[serde(with = "u256_string")]
        protocol_fee: U256,
        #[serde(with = "u256_string")]
        partner_fee: U256,
    },
    /// A partner withdrew accrued fees.
    Withdrawal {
        asset: Address,
        partner: Address,
        #[serde(with = "u256_string")]
        amount: U256,
    },
}

/// Execution trace of one instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub adapter: AdapterId,
    pub chained: bool,
    pub asset_in: Address,
    /// Amount-in actually used, after any chained override.
    #[serde(with = "u256_string")]
    pub amount_in: U256,
    pub outcome: Outcome,
    /// Amount delivered to the recipient, for unchained swaps.
    #[serde(with = "u256_string_option")]
    pub delivered: Option<U256>,
}

/// Per-instruction trace of a successful top-level call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub steps: Vec<StepReport>,
    /// Unused attached native value returned to the sender.
    #[serde(with = "u256_string")]
    pub refunded: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_from_str() {
        assert_eq!(Chain::from_str("Ethereum").unwrap(), Chain::Ethereum);
        assert_eq!(Chain::from_str("arbitrum").unwrap().id(), 42161);
        assert!(Chain::from_str("starknet").is_err());
    }

    #[test]
    fn test_serialize_warp_event() {
        let event = RouterEvent::Warp {
            asset_in: Address::ZERO,
            asset_out: Address::repeat_byte(0x11),
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(990u64),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "warp");
        assert_eq!(json["amount_out"], "990");
        assert_eq!(json["asset_out"], "0x1111111111111111111111111111111111111111");
    }
}
