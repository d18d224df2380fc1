use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::execution::{
    command::{AdapterId, Command},
    errors::ExecutionError,
    evm::adapters::{
        entry_point,
        interfaces::{IAcrossSpokePool, ICelerBridge, IHopL1Bridge, IStargateRouter},
        mismatched,
        payloads::{BridgeFields, BridgeTransfer},
        Adapter, AdapterContext, Instruction,
    },
    models::Outcome,
};

/// Decodes a bridge payload and resolves the bridge contract selected by `index`.
fn decode_transfer(
    adapter: AdapterId,
    entry_points: &[Address],
    index: u8,
    command: &Command,
    payload: &[u8],
    amount_override: Option<U256>,
) -> Result<Instruction, ExecutionError> {
    let target = entry_point(adapter, entry_points, index)?;
    let mut transfer = BridgeTransfer::decode(adapter, payload)?;
    if let Some(amount) = amount_override {
        transfer.amount = amount;
    }
    Ok(Instruction::Bridge { target, routing: command.routing, transfer })
}

fn unpack<'a>(
    adapter: AdapterId,
    instruction: &'a Instruction,
) -> Result<(Address, [u8; 2], &'a BridgeTransfer), ExecutionError> {
    match instruction {
        Instruction::Bridge { target, routing, transfer } if transfer.fields.adapter() == adapter => {
            Ok((*target, *routing, transfer))
        }
        _ => Err(mismatched(adapter, instruction)),
    }
}

/// Hands `transfer` to the bridge at `target` and checks that exactly the bridged amount left
/// custody.
///
/// Tokens are pulled by the bridge through a temporary allowance; native currency, and any
/// `native_fee`, is attached to the call.
fn send(
    ctx: &mut AdapterContext<'_>,
    target: Address,
    transfer: &BridgeTransfer,
    native_fee: U256,
    data: &[u8],
) -> Result<Outcome, ExecutionError> {
    let native = transfer.asset == Address::ZERO;
    let value = if native { transfer.amount + native_fee } else { native_fee };
    let expected = if native { value } else { transfer.amount };

    let before = ctx.balance(transfer.asset);
    ctx.with_approval(transfer.asset, target, transfer.amount, |ctx| ctx.call(target, value, data))?;
    let spent = before.saturating_sub(ctx.balance(transfer.asset));
    if spent != expected {
        return Err(ExecutionError::ExternalFailure {
            target,
            reason: format!("bridge took {} of {}, expected {}", spent, transfer.asset, expected),
        });
    }
    debug!(
        adapter = %transfer.fields.adapter(),
        bridge = %target,
        asset = %transfer.asset,
        amount = %transfer.amount,
        destination_chain_id = %transfer.destination_chain_id,
        "Bridge transfer sent"
    );
    Ok(Outcome::Bridged)
}

fn narrow<T: TryFrom<U256>>(value: U256, what: &str) -> Result<T, ExecutionError> {
    T::try_from(value)
        .map_err(|_| ExecutionError::InvalidInput(format!("{} {} is out of range", what, value)))
}

/// Deposits into an Across style spoke pool.
///
/// # Fields
/// * `spoke_pools` - Spoke pools, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct AcrossAdapter {
    spoke_pools: Vec<Address>,
}

impl AcrossAdapter {
    pub fn new(spoke_pools: Vec<Address>) -> Self {
        Self { spoke_pools }
    }
}

impl Adapter for AcrossAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::Across
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        decode_transfer(
            self.id(),
            &self.spoke_pools,
            command.routing[0],
            command,
            payload,
            amount_override,
        )
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let (spoke_pool, _, transfer) = unpack(self.id(), instruction)?;
        let BridgeFields::Across { relayer_fee_pct, quote_timestamp, message } = &transfer.fields
        else {
            return Err(mismatched(self.id(), instruction));
        };
        // Spoke pools take native deposits as the wrapped asset plus attached value.
        let origin_token =
            if transfer.asset == Address::ZERO { ctx.wrapped_native } else { transfer.asset };
        let data = IAcrossSpokePool::depositCall {
            recipient: transfer.recipient,
            originToken: origin_token,
            amount: transfer.amount,
            destinationChainId: transfer.destination_chain_id,
            relayerFeePct: *relayer_fee_pct,
            quoteTimestamp: *quote_timestamp,
            message: message.clone(),
            maxCount: U256::MAX,
        }
        .abi_encode();
        send(ctx, spoke_pool, transfer, U256::ZERO, &data)
    }
}

/// Sends through a Celer cBridge style liquidity bridge.
///
/// # Fields
/// * `bridges` - Bridge contracts, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct CelerAdapter {
    bridges: Vec<Address>,
}

impl CelerAdapter {
    pub fn new(bridges: Vec<Address>) -> Self {
        Self { bridges }
    }
}

impl Adapter for CelerAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::Celer
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        decode_transfer(
            self.id(),
            &self.bridges,
            command.routing[0],
            command,
            payload,
            amount_override,
        )
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let (bridge, _, transfer) = unpack(self.id(), instruction)?;
        let BridgeFields::Celer { nonce, max_slippage } = transfer.fields else {
            return Err(mismatched(self.id(), instruction));
        };
        let dst_chain_id: u64 = narrow(transfer.destination_chain_id, "Destination chain id")?;
        let data = if transfer.asset == Address::ZERO {
            ICelerBridge::sendNativeCall {
                _receiver: transfer.recipient,
                _amount: transfer.amount,
                _dstChainId: dst_chain_id,
                _nonce: nonce,
                _maxSlippage: max_slippage,
            }
            .abi_encode()
        } else {
            ICelerBridge::sendCall {
                _receiver: transfer.recipient,
                _token: transfer.asset,
                _amount: transfer.amount,
                _dstChainId: dst_chain_id,
                _nonce: nonce,
                _maxSlippage: max_slippage,
            }
            .abi_encode()
        };
        send(ctx, bridge, transfer, U256::ZERO, &data)
    }
}

/// Swaps into a Stargate style pool bridge.
///
/// The routing bytes carry the source and destination pool ids; the router is always the first
/// configured entry point.
#[derive(Clone, Debug)]
pub struct StargateAdapter {
    routers: Vec<Address>,
}

impl StargateAdapter {
    pub fn new(routers: Vec<Address>) -> Self {
        Self { routers }
    }
}

impl Adapter for StargateAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::Stargate
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        let instruction =
            decode_transfer(self.id(), &self.routers, 0, command, payload, amount_override)?;
        if instruction.asset_in() == Address::ZERO {
            return Err(ExecutionError::Decode(
                "Stargate pools do not take native currency".to_string(),
            ));
        }
        Ok(instruction)
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let (router, routing, transfer) = unpack(self.id(), instruction)?;
        let BridgeFields::Stargate { min_amount_ld, lz_fee } = transfer.fields else {
            return Err(mismatched(self.id(), instruction));
        };
        let dst_chain_id: u16 = narrow(transfer.destination_chain_id, "Destination chain id")?;
        let data = IStargateRouter::swapCall {
            _dstChainId: dst_chain_id,
            _srcPoolId: U256::from(routing[0]),
            _dstPoolId: U256::from(routing[1]),
            _refundAddress: ctx.sender,
            _amountLD: transfer.amount,
            _minAmountLD: min_amount_ld,
            _lzTxParams: IStargateRouter::LzTxObj {
                dstGasForCall: U256::ZERO,
                dstNativeAmount: U256::ZERO,
                dstNativeAddr: Bytes::new(),
            },
            _to: Bytes::copy_from_slice(transfer.recipient.as_slice()),
            _payload: Bytes::new(),
        }
        .abi_encode();
        send(ctx, router, transfer, lz_fee, &data)
    }
}

/// Sends to an L2 through a Hop style L1 bridge.
///
/// # Fields
/// * `bridges` - One bridge per asset variant, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct HopAdapter {
    bridges: Vec<Address>,
}

impl HopAdapter {
    pub fn new(bridges: Vec<Address>) -> Self {
        Self { bridges }
    }
}

impl Adapter for HopAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::Hop
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        decode_transfer(
            self.id(),
            &self.bridges,
            command.routing[0],
            command,
            payload,
            amount_override,
        )
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let (bridge, _, transfer) = unpack(self.id(), instruction)?;
        let BridgeFields::Hop { relayer_fee, amount_out_min, deadline, relayer } = transfer.fields
        else {
            return Err(mismatched(self.id(), instruction));
        };
        let data = IHopL1Bridge::sendToL2Call {
            chainId: transfer.destination_chain_id,
            recipient: transfer.recipient,
            amount: transfer.amount,
            amountOutMin: amount_out_min,
            deadline,
            relayer,
            relayerFee: relayer_fee,
        }
        .abi_encode();
        send(ctx, bridge, transfer, U256::ZERO, &data)
    }
}
