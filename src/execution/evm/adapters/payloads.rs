//! Typed payloads of each adapter family and their byte layouts.
//!
//! Swap payloads share the envelope
//! `amountIn(32) | amountOutMin(32) | route | hopCount(1) | recipientFlag(1) [| recipient(20)]`;
//! bridge payloads are `amount(32) | asset(20) | destinationChainId(32) | recipient(20) | fields`.
//! Every `encode` re-decodes its own output and refuses payloads the decoder would read back
//! differently.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::execution::{
    codec::{PayloadReader, PayloadWriter, ADDRESS},
    command::AdapterId,
    errors::ExecutionError,
    evm::constants::{MAX_HOPS, STABLESWAP_SELECTORS},
    serde_primitives::u256_string,
};

const NO_RECIPIENT: u8 = 0;
const EXPLICIT_RECIPIENT: u8 = 1;

/// Swap through a generic AMM router along a dense address path.
///
/// The zero address stands for native currency and may only open or close the path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmSwap {
    #[serde(with = "u256_string")]
    pub amount_in: U256,
    #[serde(with = "u256_string")]
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    #[serde(default)]
    pub recipient: Option<Address>,
}

impl AmmSwap {
    pub fn decode(payload: &[u8]) -> Result<Self, ExecutionError> {
        let mut reader = PayloadReader::new(payload);
        let amount_in = reader.read_u256()?;
        let amount_out_min = reader.read_u256()?;
        let (path, recipient) = read_route(reader.read_rest(), |reader, hops| {
            let path = (0..=hops)
                .map(|_| reader.read_address())
                .collect::<Result<Vec<_>, _>>()?;
            check_native_positions(&path)?;
            Ok(path)
        })?;
        Ok(Self { amount_in, amount_out_min, path, recipient })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExecutionError> {
        if self.path.len() < 2 {
            return Err(ExecutionError::InvalidInput(
                "Swap path needs at least two assets".to_string(),
            ));
        }
        let writer = self
            .path
            .iter()
            .fold(write_amounts(self.amount_in, self.amount_out_min), |writer, asset| {
                writer.address(*asset)
            });
        let payload = write_trailer(writer, self.path.len() - 1, self.recipient)?.build();
        ensure_round_trip(self, payload, Self::decode)
    }
}

/// One pool of a concentrated-liquidity path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHop {
    /// Fee tier in hundredths of a basis point (3 bytes).
    pub fee: u32,
    pub token_out: Address,
}

/// Swap through a concentrated-liquidity router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentratedSwap {
    #[serde(with = "u256_string")]
    pub amount_in: U256,
    #[serde(with = "u256_string")]
    pub amount_out_min: U256,
    /// Input token; the zero address means native currency, wrapped before the swap.
    pub token_in: Address,
    pub hops: Vec<PoolHop>,
    #[serde(default)]
    pub recipient: Option<Address>,
}

impl ConcentratedSwap {
    pub fn decode(payload: &[u8]) -> Result<Self, ExecutionError> {
        let mut reader = PayloadReader::new(payload);
        let amount_in = reader.read_u256()?;
        let amount_out_min = reader.read_u256()?;
        let ((token_in, hops), recipient) = read_route(reader.read_rest(), |reader, hops| {
            let token_in = reader.read_address()?;
            let hops = (0..hops)
                .map(|_| -> Result<PoolHop, ExecutionError> {
                    let fee = reader.read_uint(3)? as u32;
                    let token_out = reader.read_address()?;
                    if token_out == Address::ZERO {
                        return Err(ExecutionError::Decode(
                            "Native currency can only be the first token of a pool path"
                                .to_string(),
                        ));
                    }
                    Ok(PoolHop { fee, token_out })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((token_in, hops))
        })?;
        Ok(Self { amount_in, amount_out_min, token_in, hops, recipient })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExecutionError> {
        let mut writer =
            write_amounts(self.amount_in, self.amount_out_min).address(self.token_in);
        for hop in &self.hops {
            writer = writer
                .uint(u64::from(hop.fee), 3)?
                .address(hop.token_out);
        }
        let payload = write_trailer(writer, self.hops.len(), self.recipient)?.build();
        ensure_round_trip(self, payload, Self::decode)
    }

    pub fn token_out(&self) -> Address {
        self.hops
            .last()
            .map(|hop| hop.token_out)
            .unwrap_or(self.token_in)
    }
}

/// One pool exchange of a stableswap route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableHop {
    pub pool: Address,
    pub asset_out: Address,
    /// Pool function to call, one of the `exchange` variants.
    pub selector: FixedBytes<4>,
    pub i: u8,
    pub j: u8,
}

/// Sequence of exchanges on stableswap pools; each hop spends what the previous one produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableSwap {
    #[serde(with = "u256_string")]
    pub amount_in: U256,
    #[serde(with = "u256_string")]
    pub amount_out_min: U256,
    pub asset_in: Address,
    pub hops: Vec<StableHop>,
    #[serde(default)]
    pub recipient: Option<Address>,
}

impl StableSwap {
    pub fn decode(payload: &[u8]) -> Result<Self, ExecutionError> {
        let mut reader = PayloadReader::new(payload);
        let amount_in = reader.read_u256()?;
        let amount_out_min = reader.read_u256()?;
        let ((asset_in, hops), recipient) = read_route(reader.read_rest(), |reader, hops| {
            let asset_in = reader.read_address()?;
            let hops = (0..hops)
                .map(|_| -> Result<StableHop, ExecutionError> {
                    let hop = StableHop {
                        pool: reader.read_address()?,
                        asset_out: reader.read_address()?,
                        selector: reader.read_selector()?,
                        i: reader.read_u8()?,
                        j: reader.read_u8()?,
                    };
                    if !STABLESWAP_SELECTORS.contains(&hop.selector) {
                        return Err(ExecutionError::Decode(format!(
                            "Unsupported stableswap function {}",
                            hop.selector
                        )));
                    }
                    Ok(hop)
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((asset_in, hops))
        })?;
        Ok(Self { amount_in, amount_out_min, asset_in, hops, recipient })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExecutionError> {
        let mut writer =
            write_amounts(self.amount_in, self.amount_out_min).address(self.asset_in);
        for hop in &self.hops {
            writer = writer
                .address(hop.pool)
                .address(hop.asset_out)
                .selector(hop.selector)
                .u8(hop.i)
                .u8(hop.j);
        }
        let payload = write_trailer(writer, self.hops.len(), self.recipient)?.build();
        ensure_round_trip(self, payload, Self::decode)
    }

    pub fn asset_out(&self) -> Address {
        self.hops
            .last()
            .map(|hop| hop.asset_out)
            .unwrap_or(self.asset_in)
    }
}

/// One pool of a weighted-pool vault route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedHop {
    pub pool_id: B256,
    pub asset_in: Address,
    pub asset_out: Address,
    #[serde(default)]
    pub user_data: Bytes,
}

/// Swap through a weighted-pool vault: a single swap for one hop, a batch swap otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedSwap {
    #[serde(with = "u256_string")]
    pub amount_in: U256,
    #[serde(with = "u256_string")]
    pub amount_out_min: U256,
    pub hops: Vec<WeightedHop>,
    #[serde(default)]
    pub recipient: Option<Address>,
}

impl WeightedSwap {
    pub fn decode(payload: &[u8]) -> Result<Self, ExecutionError> {
        let mut reader = PayloadReader::new(payload);
        let amount_in = reader.read_u256()?;
        let amount_out_min = reader.read_u256()?;
        let (hops, recipient) = read_route(reader.read_rest(), |reader, hops| {
            let hops = (0..hops)
                .map(|_| -> Result<WeightedHop, ExecutionError> {
                    Ok(WeightedHop {
                        pool_id: reader.read_word()?,
                        asset_in: reader.read_address()?,
                        asset_out: reader.read_address()?,
                        user_data: Bytes::copy_from_slice(reader.read_prefixed_bytes()?),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(pair) = hops
                .windows(2)
                .find(|pair| pair[0].asset_out != pair[1].asset_in)
            {
                return Err(ExecutionError::Decode(format!(
                    "Pool route is not continuous: {} then {}",
                    pair[0].asset_out, pair[1].asset_in
                )));
            }
            Ok(hops)
        })?;
        Ok(Self { amount_in, amount_out_min, hops, recipient })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExecutionError> {
        let mut writer = write_amounts(self.amount_in, self.amount_out_min);
        for hop in &self.hops {
            writer = writer
                .word(hop.pool_id)
                .address(hop.asset_in)
                .address(hop.asset_out)
                .prefixed_bytes(&hop.user_data)?;
        }
        let payload = write_trailer(writer, self.hops.len(), self.recipient)?.build();
        ensure_round_trip(self, payload, Self::decode)
    }

    pub fn asset_in(&self) -> Address {
        self.hops
            .first()
            .map(|hop| hop.asset_in)
            .unwrap_or_default()
    }

    pub fn asset_out(&self) -> Address {
        self.hops
            .last()
            .map(|hop| hop.asset_out)
            .unwrap_or_default()
    }
}

/// Protocol-specific tail of a bridge payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "snake_case")]
pub enum BridgeFields {
    /// `relayerFeePct(8) | quoteTimestamp(4) | message(rest)`
    Across {
        relayer_fee_pct: i64,
        quote_timestamp: u32,
        #[serde(default)]
        message: Bytes,
    },
    /// `nonce(8) | maxSlippage(4)`
    Celer { nonce: u64, max_slippage: u32 },
    /// `minAmountLD(32) | lzFee(32)`; the messaging fee is paid in native currency.
    Stargate {
        #[serde(with = "u256_string")]
        min_amount_ld: U256,
        #[serde(with = "u256_string")]
        lz_fee: U256,
    },
    /// `relayerFee(32) | amountOutMin(32) | deadline(32) | relayer(20)`
    Hop {
        #[serde(with = "u256_string")]
        relayer_fee: U256,
        #[serde(with = "u256_string")]
        amount_out_min: U256,
        #[serde(with = "u256_string")]
        deadline: U256,
        relayer: Address,
    },
}

impl BridgeFields {
    pub fn adapter(&self) -> AdapterId {
        match self {
            BridgeFields::Across { .. } => AdapterId::Across,
            BridgeFields::Celer { .. } => AdapterId::Celer,
            BridgeFields::Stargate { .. } => AdapterId::Stargate,
            BridgeFields::Hop { .. } => AdapterId::Hop,
        }
    }
}

/// A terminal transfer of `amount` of `asset` to `recipient` on another chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeTransfer {
    #[serde(with = "u256_string")]
    pub amount: U256,
    pub asset: Address,
    #[serde(with = "u256_string")]
    pub destination_chain_id: U256,
    pub recipient: Address,
    pub fields: BridgeFields,
}

impl BridgeTransfer {
    pub fn decode(adapter: AdapterId, payload: &[u8]) -> Result<Self, ExecutionError> {
        let mut reader = PayloadReader::new(payload);
        let amount = reader.read_u256()?;
        let asset = reader.read_address()?;
        let destination_chain_id = reader.read_u256()?;
        let recipient = reader.read_address()?;
        let fields = match adapter {
            AdapterId::Across => BridgeFields::Across {
                relayer_fee_pct: reader.read_uint(8)? as i64,
                quote_timestamp: reader.read_uint(4)? as u32,
                message: Bytes::copy_from_slice(reader.read_rest()),
            },
            AdapterId::Celer => BridgeFields::Celer {
                nonce: reader.read_uint(8)?,
                max_slippage: reader.read_uint(4)? as u32,
            },
            AdapterId::Stargate => BridgeFields::Stargate {
                min_amount_ld: reader.read_u256()?,
                lz_fee: reader.read_u256()?,
            },
            AdapterId::Hop => BridgeFields::Hop {
                relayer_fee: reader.read_u256()?,
                amount_out_min: reader.read_u256()?,
                deadline: reader.read_u256()?,
                relayer: reader.read_address()?,
            },
            other => {
                return Err(ExecutionError::Decode(format!("{} is not a bridge adapter", other)))
            }
        };
        reader.finish()?;
        Ok(Self { amount, asset, destination_chain_id, recipient, fields })
    }

    pub fn encode(&self) -> Result<Vec<u8>, ExecutionError> {
        let writer = PayloadWriter::new()
            .u256(self.amount)
            .address(self.asset)
            .u256(self.destination_chain_id)
            .address(self.recipient);
        let writer = match &self.fields {
            BridgeFields::Across { relayer_fee_pct, quote_timestamp, message } => writer
                .uint(*relayer_fee_pct as u64, 8)?
                .uint(u64::from(*quote_timestamp), 4)?
                .bytes(message),
            BridgeFields::Celer { nonce, max_slippage } => writer
                .uint(*nonce, 8)?
                .uint(u64::from(*max_slippage), 4)?,
            BridgeFields::Stargate { min_amount_ld, lz_fee } => writer
                .u256(*min_amount_ld)
                .u256(*lz_fee),
            BridgeFields::Hop { relayer_fee, amount_out_min, deadline, relayer } => writer
                .u256(*relayer_fee)
                .u256(*amount_out_min)
                .u256(*deadline)
                .address(*relayer),
        };
        Ok(writer.build())
    }
}

fn write_amounts(amount_in: U256, amount_out_min: U256) -> PayloadWriter {
    PayloadWriter::new()
        .u256(amount_in)
        .u256(amount_out_min)
}

/// Splits the closing `hopCount | recipientFlag [| recipient]` off `data` and parses the route in
/// front of it.
///
/// The route carries no length, so the trailer is located by trying the bare shape (flag `0` in
/// the last byte) and then the explicit-recipient shape (flag `1` 21 bytes from the end). A shape
/// is accepted only if `parse_route` consumes the route exactly for the hop count it carries.
fn read_route<T, F>(data: &[u8], parse_route: F) -> Result<(T, Option<Address>), ExecutionError>
where
    F: Fn(&mut PayloadReader<'_>, u8) -> Result<T, ExecutionError>,
{
    let len = data.len();
    let mut error =
        ExecutionError::Decode(format!("No hop count and recipient flag in {} route bytes", len));
    if len >= 2 && data[len - 1] == NO_RECIPIENT {
        match parse_exact(&data[..len - 2], data[len - 2], &parse_route) {
            Ok(route) => return Ok((route, None)),
            Err(err) => error = err,
        }
    }
    if len >= 2 + ADDRESS && data[len - 1 - ADDRESS] == EXPLICIT_RECIPIENT {
        let recipient = Address::from_slice(&data[len - ADDRESS..]);
        match parse_exact(&data[..len - 2 - ADDRESS], data[len - 2 - ADDRESS], &parse_route) {
            Ok(route) => return Ok((route, Some(recipient))),
            Err(err) => error = err,
        }
    }
    Err(error)
}

fn parse_exact<T, F>(route: &[u8], hops: u8, parse_route: &F) -> Result<T, ExecutionError>
where
    F: Fn(&mut PayloadReader<'_>, u8) -> Result<T, ExecutionError>,
{
    if hops == 0 || hops > MAX_HOPS {
        return Err(ExecutionError::Decode(format!("Invalid hop count {}", hops)));
    }
    let mut reader = PayloadReader::new(route);
    let parsed = parse_route(&mut reader, hops)?;
    reader.finish()?;
    Ok(parsed)
}

fn write_trailer(
    writer: PayloadWriter,
    hops: usize,
    recipient: Option<Address>,
) -> Result<PayloadWriter, ExecutionError> {
    if hops == 0 || hops > MAX_HOPS as usize {
        return Err(ExecutionError::InvalidInput(format!(
            "Hop count must be between 1 and {}, got {}",
            MAX_HOPS, hops
        )));
    }
    let writer = writer.u8(hops as u8);
    Ok(match recipient {
        Some(recipient) => writer
            .u8(EXPLICIT_RECIPIENT)
            .address(recipient),
        None => writer.u8(NO_RECIPIENT),
    })
}

fn ensure_round_trip<T, F>(value: &T, payload: Vec<u8>, decode: F) -> Result<Vec<u8>, ExecutionError>
where
    T: PartialEq,
    F: Fn(&[u8]) -> Result<T, ExecutionError>,
{
    let decoded = decode(&payload).map_err(|e| ExecutionError::InvalidInput(e.to_string()))?;
    if decoded != *value {
        return Err(ExecutionError::InvalidInput(
            "Payload trailer is ambiguous for this route and recipient".to_string(),
        ));
    }
    Ok(payload)
}

fn check_native_positions(path: &[Address]) -> Result<(), ExecutionError> {
    let last = path.len() - 1;
    let interior_native = path
        .iter()
        .enumerate()
        .any(|(position, asset)| *asset == Address::ZERO && position != 0 && position != last);
    if interior_native || (path[0] == Address::ZERO && path[last] == Address::ZERO) {
        return Err(ExecutionError::Decode(
            "Native currency can only open or close a swap path".to_string(),
        ));
    }
    Ok(())
}
