use std::str::FromStr;

use alloy_primitives::U256;
use num_bigint::BigUint;
use serde::{self, Deserialize, Deserializer, Serializer};

use crate::execution::evm::utils::biguint_to_u256;

fn serialize_u256<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

fn parse_u256<E: serde::de::Error>(s: &str) -> Result<U256, E> {
    let value = BigUint::from_str(s).map_err(E::custom)?;
    biguint_to_u256(&value).map_err(E::custom)
}

/// Amounts are carried as decimal strings in JSON so that 256-bit values survive any consumer.
pub mod u256_string {
    use super::*;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serialize_u256(value, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_u256(&s)
    }
}

pub mod u256_string_option {
    use super::*;

    pub fn serialize<S>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serialize_u256(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse_u256(&s))
            .transpose()
    }
}
