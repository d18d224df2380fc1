use std::error::Error;

use chrono::Utc;
use num_bigint::BigUint;
use num_traits::Num;
use serde::Deserialize;
use serde_json::{Map, Value};
use warp_router::execution::{
    command::{AdapterId, Command},
    evm::adapters::payloads::{
        AmmSwap, BridgeTransfer, ConcentratedSwap, StableSwap, WeightedSwap,
    },
};

/// Keys holding 256-bit amounts, accepted as decimal strings, `0x` hex strings or numbers.
const AMOUNT_KEYS: [&str; 8] = [
    "amount_in",
    "amount_out_min",
    "amount",
    "destination_chain_id",
    "min_amount_ld",
    "lz_fee",
    "relayer_fee",
    "deadline",
];

#[derive(Debug, Deserialize)]
pub struct InstructionInput {
    pub adapter: AdapterId,
    #[serde(default)]
    pub chained: bool,
    #[serde(default)]
    pub routing: [u8; 2],
    pub payload: Value,
}

pub fn parse_instructions(input: &str) -> Result<Vec<InstructionInput>, Box<dyn Error>> {
    let value: Value = serde_json::from_str(input)?;
    if !value.is_array() {
        return Err("Input must be a JSON array of instructions".into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Encodes one instruction into its command bytes and payload.
pub fn encode_instruction(
    input: InstructionInput,
    deadline_window: u64,
) -> Result<(Command, Vec<u8>), Box<dyn Error>> {
    let command = Command::new(input.adapter, input.chained, input.routing);
    let mut payload = input.payload;
    let obj = payload
        .as_object_mut()
        .ok_or("payload must be a JSON object")?;
    normalize_amounts(obj)?;

    let encoded = match input.adapter {
        AdapterId::GenericAmm => serde_json::from_value::<AmmSwap>(payload)?.encode()?,
        AdapterId::ConcentratedLiquidity => {
            serde_json::from_value::<ConcentratedSwap>(payload)?.encode()?
        }
        AdapterId::Stableswap => serde_json::from_value::<StableSwap>(payload)?.encode()?,
        AdapterId::WeightedPool => serde_json::from_value::<WeightedSwap>(payload)?.encode()?,
        bridge => {
            let fields = obj
                .entry("fields")
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or("fields must be a JSON object")?;
            fill_bridge_defaults(bridge, fields, deadline_window);
            normalize_amounts(fields)?;
            serde_json::from_value::<BridgeTransfer>(payload)?.encode()?
        }
    };
    Ok((command, encoded))
}

fn fill_bridge_defaults(adapter: AdapterId, fields: &mut Map<String, Value>, deadline_window: u64) {
    let now = Utc::now();
    fields
        .entry("protocol")
        .or_insert_with(|| Value::from(adapter.name()));
    match adapter {
        AdapterId::Across => {
            fields
                .entry("quote_timestamp")
                .or_insert_with(|| Value::from(now.timestamp() as u32));
        }
        AdapterId::Celer => {
            fields
                .entry("nonce")
                .or_insert_with(|| Value::from(now.timestamp_millis() as u64));
        }
        AdapterId::Hop => {
            fields
                .entry("deadline")
                .or_insert_with(|| Value::from(now.timestamp() as u64 + deadline_window));
        }
        _ => {}
    }
}

/// Rewrites every amount of `obj` as the decimal string the payload types deserialize.
fn normalize_amounts(obj: &mut Map<String, Value>) -> Result<(), Box<dyn Error>> {
    for key in AMOUNT_KEYS {
        let Some(value) = obj.get_mut(key) else { continue };
        let decimal = match value {
            Value::Number(number) => number
                .as_u64()
                .ok_or_else(|| format!("{} must be a non-negative integer", key))?
                .to_string(),
            Value::String(s) => match s.strip_prefix("0x") {
                Some(digits) => BigUint::from_str_radix(digits, 16)?.to_string(),
                None => continue,
            },
            _ => return Err(format!("{} must be a string or a number", key).into()),
        };
        *value = Value::String(decimal);
    }
    Ok(())
}
