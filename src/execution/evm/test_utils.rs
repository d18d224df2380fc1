//! Stand-ins for the external protocols the router calls, plus shared fixtures.
//!
//! Each mock decodes its calldata with the same `sol!` interfaces the adapters encode with and
//! prices every swap at a fixed `numerator / denominator` rate.

use alloy_primitives::{address, Address, Bytes, I256, U256};
use alloy_sol_types::{SolCall, SolValue};

use crate::execution::evm::{
    adapters::interfaces::{
        IAcrossSpokePool, IBalancerVault, ICelerBridge, ICurvePool, IHopL1Bridge,
        IStargateRouter, ISwapRouter, IUniswapV2Router02,
    },
    host::{selector, CallFrame, ExternalProtocol, Host, HostError, World, WrappedNative},
};

pub const TIMESTAMP: u64 = 1_700_000_000;

pub fn usdc() -> Address {
    address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")
}

pub fn dai() -> Address {
    address!("6b175474e89094c44da98b954eedeac495271d0f")
}

pub fn weth() -> Address {
    address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")
}

/// Address the router under test is deployed at.
pub fn router() -> Address {
    address!("aa820c29648d5ea543d712cc928377bd7206a0e7")
}

pub fn sender() -> Address {
    address!("cd09f75e2bf2a4d11f3ab23f1389fcc1621c0cc2")
}

/// A host with the wrapped-native contract deployed.
pub fn host() -> Host {
    let mut host = Host::new(TIMESTAMP);
    host.deploy(weth(), WrappedNative);
    host
}

fn decode<C: SolCall>(data: &[u8]) -> Result<C, HostError> {
    C::abi_decode(data, true).map_err(|e| HostError::Revert(e.to_string()))
}

fn require(condition: bool, reason: &str) -> Result<(), HostError> {
    if condition {
        Ok(())
    } else {
        Err(HostError::Revert(reason.to_string()))
    }
}

fn index(value: U256) -> Result<usize, HostError> {
    usize::try_from(value).map_err(|_| HostError::Revert("index out of range".to_string()))
}

#[derive(Clone, Copy, Debug)]
struct Rate {
    numerator: u64,
    denominator: u64,
}

impl Rate {
    fn quote(&self, amount: U256) -> U256 {
        amount * U256::from(self.numerator) / U256::from(self.denominator)
    }
}

/// Uniswap V2 style router.
pub struct MockAmmRouter {
    rate: Rate,
    wrapped_native: Address,
}

impl MockAmmRouter {
    pub fn new(numerator: u64, denominator: u64, wrapped_native: Address) -> Self {
        Self { rate: Rate { numerator, denominator }, wrapped_native }
    }

    fn ends(path: &[Address]) -> Result<(Address, Address), HostError> {
        match (path.first(), path.last()) {
            (Some(first), Some(last)) if path.len() >= 2 => Ok((*first, *last)),
            _ => Err(HostError::Revert("INVALID_PATH".to_string())),
        }
    }

    fn pay(
        &self,
        world: &mut World,
        frame: &CallFrame<'_>,
        token: Address,
        amount: U256,
        min: U256,
        to: Address,
    ) -> Result<Vec<u8>, HostError> {
        let out = self.rate.quote(amount);
        require(out >= min, "INSUFFICIENT_OUTPUT_AMOUNT")?;
        world.transfer(token, frame.this, to, out)?;
        Ok(vec![amount, out].abi_encode())
    }
}

impl ExternalProtocol for MockAmmRouter {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        match selector(frame.data)? {
            IUniswapV2Router02::swapExactTokensForTokensCall::SELECTOR => {
                let call: IUniswapV2Router02::swapExactTokensForTokensCall = decode(frame.data)?;
                require(call.deadline >= U256::from(world.timestamp()), "EXPIRED")?;
                let (token_in, token_out) = Self::ends(&call.path)?;
                world.transfer_from(token_in, frame.this, frame.caller, frame.this, call.amountIn)?;
                self.pay(world, &frame, token_out, call.amountIn, call.amountOutMin, call.to)
            }
            IUniswapV2Router02::swapExactETHForTokensCall::SELECTOR => {
                let call: IUniswapV2Router02::swapExactETHForTokensCall = decode(frame.data)?;
                let (token_in, token_out) = Self::ends(&call.path)?;
                require(token_in == self.wrapped_native, "INVALID_PATH")?;
                self.pay(world, &frame, token_out, frame.value, call.amountOutMin, call.to)
            }
            IUniswapV2Router02::swapExactTokensForETHCall::SELECTOR => {
                let call: IUniswapV2Router02::swapExactTokensForETHCall = decode(frame.data)?;
                let (token_in, token_out) = Self::ends(&call.path)?;
                require(token_out == self.wrapped_native, "INVALID_PATH")?;
                world.transfer_from(token_in, frame.this, frame.caller, frame.this, call.amountIn)?;
                self.pay(world, &frame, Address::ZERO, call.amountIn, call.amountOutMin, call.to)
            }
            _ => Err(HostError::Revert("unknown selector".to_string())),
        }
    }
}

/// Uniswap V3 style `SwapRouter`; multi-hop paths are priced once, end to end.
pub struct MockConcentratedRouter {
    rate: Rate,
}

impl MockConcentratedRouter {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self { rate: Rate { numerator, denominator } }
    }
}

impl ExternalProtocol for MockConcentratedRouter {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        let (token_in, token_out, amount_in, min, recipient) = match selector(frame.data)? {
            ISwapRouter::exactInputSingleCall::SELECTOR => {
                let params = decode::<ISwapRouter::exactInputSingleCall>(frame.data)?.params;
                (
                    params.tokenIn,
                    params.tokenOut,
                    params.amountIn,
                    params.amountOutMinimum,
                    params.recipient,
                )
            }
            ISwapRouter::exactInputCall::SELECTOR => {
                let params = decode::<ISwapRouter::exactInputCall>(frame.data)?.params;
                let path = params.path.as_ref();
                require(path.len() >= 43, "invalid path")?;
                (
                    Address::from_slice(&path[..20]),
                    Address::from_slice(&path[path.len() - 20..]),
                    params.amountIn,
                    params.amountOutMinimum,
                    params.recipient,
                )
            }
            _ => return Err(HostError::Revert("unknown selector".to_string())),
        };
        world.transfer_from(token_in, frame.this, frame.caller, frame.this, amount_in)?;
        let out = self.rate.quote(amount_in);
        require(out >= min, "Too little received")?;
        world.transfer(token_out, frame.this, recipient, out)?;
        Ok(out.abi_encode())
    }
}

/// Curve style pool over `coins`; the zero address is native currency.
pub struct MockStablePool {
    coins: Vec<Address>,
    rate: Rate,
}

impl MockStablePool {
    pub fn new(coins: Vec<Address>, numerator: u64, denominator: u64) -> Self {
        Self { coins, rate: Rate { numerator, denominator } }
    }

    fn coin(&self, i: i128) -> Result<Address, HostError> {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.coins.get(i).copied())
            .ok_or_else(|| HostError::Revert("invalid coin index".to_string()))
    }
}

impl ExternalProtocol for MockStablePool {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        let sel = selector(frame.data)?;
        require(
            sel == ICurvePool::exchangeCall::SELECTOR ||
                sel == ICurvePool::exchange_underlyingCall::SELECTOR,
            "unknown selector",
        )?;
        let call = ICurvePool::exchangeCall::abi_decode_raw(&frame.data[4..], true)
            .map_err(|e| HostError::Revert(e.to_string()))?;
        let (coin_in, coin_out) = (self.coin(call.i)?, self.coin(call.j)?);
        if coin_in == Address::ZERO {
            require(frame.value == call.dx, "invalid value")?;
        } else {
            world.transfer_from(coin_in, frame.this, frame.caller, frame.this, call.dx)?;
        }
        let out = self.rate.quote(call.dx);
        require(out >= call.min_dy, "Exchange resulted in fewer coins than expected")?;
        world.transfer(coin_out, frame.this, frame.caller, out)?;
        Ok(out.abi_encode())
    }
}

/// Balancer V2 style vault; every pool of a batch applies the rate again.
pub struct MockVault {
    rate: Rate,
}

impl MockVault {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self { rate: Rate { numerator, denominator } }
    }

    fn settle(
        world: &mut World,
        frame: &CallFrame<'_>,
        funds: &IBalancerVault::FundManagement,
        (asset_in, amount_in): (Address, U256),
        (asset_out, amount_out): (Address, U256),
    ) -> Result<(), HostError> {
        if asset_in == Address::ZERO {
            require(frame.value == amount_in, "BAL#505")?;
        } else {
            world.transfer_from(asset_in, frame.this, funds.sender, frame.this, amount_in)?;
        }
        world.transfer(asset_out, frame.this, funds.recipient, amount_out)
    }
}

impl ExternalProtocol for MockVault {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        match selector(frame.data)? {
            IBalancerVault::swapCall::SELECTOR => {
                let call: IBalancerVault::swapCall = decode(frame.data)?;
                let swap = &call.singleSwap;
                let out = self.rate.quote(swap.amount);
                require(out >= call.limit, "BAL#507")?;
                Self::settle(
                    world,
                    &frame,
                    &call.funds,
                    (swap.assetIn, swap.amount),
                    (swap.assetOut, out),
                )?;
                Ok(out.abi_encode())
            }
            IBalancerVault::batchSwapCall::SELECTOR => {
                let call: IBalancerVault::batchSwapCall = decode(frame.data)?;
                let (first, last) = match (call.swaps.first(), call.swaps.last()) {
                    (Some(first), Some(last)) => (first, last),
                    _ => return Err(HostError::Revert("empty batch".to_string())),
                };
                let amount_in = first.amount;
                let out = call
                    .swaps
                    .iter()
                    .fold(amount_in, |amount, _| self.rate.quote(amount));
                let (in_index, out_index) = (index(first.assetInIndex)?, index(last.assetOutIndex)?);
                let asset = |i: usize| {
                    call.assets
                        .get(i)
                        .copied()
                        .ok_or_else(|| HostError::Revert("BAL#100".to_string()))
                };
                let limit = |i: usize| {
                    call.limits
                        .get(i)
                        .copied()
                        .ok_or_else(|| HostError::Revert("BAL#103".to_string()))
                };
                // Limits bound the vault's net intake of each asset.
                let signed = |amount: U256| {
                    I256::try_from(amount).map_err(|_| HostError::Revert("BAL#000".to_string()))
                };
                let delta = |i: usize| -> Result<I256, HostError> {
                    let mut net = I256::ZERO;
                    if i == in_index {
                        net = net + signed(amount_in)?;
                    }
                    if i == out_index {
                        net = net - signed(out)?;
                    }
                    Ok(net)
                };
                for i in [in_index, out_index] {
                    require(delta(i)? <= limit(i)?, "BAL#507")?;
                }
                Self::settle(
                    world,
                    &frame,
                    &call.funds,
                    (asset(in_index)?, amount_in),
                    (asset(out_index)?, out),
                )?;
                Ok(vec![amount_in].abi_encode())
            }
            _ => Err(HostError::Revert("unknown selector".to_string())),
        }
    }
}

/// Accepts deposits of every bridge family and records one `Bridge` log per call.
///
/// Stargate and Hop calldata does not name the token (their contracts are per asset), so the mock
/// pulls `token` for them.
pub struct MockBridge {
    token: Address,
    shortfall: U256,
}

impl MockBridge {
    pub fn new(token: Address) -> Self {
        Self { token, shortfall: U256::ZERO }
    }

    /// Makes the bridge pull `shortfall` less than it is asked to.
    pub fn taking_less(mut self, shortfall: u64) -> Self {
        self.shortfall = U256::from(shortfall);
        self
    }

    fn pull(
        &self,
        world: &mut World,
        frame: &CallFrame<'_>,
        token: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let amount = amount.saturating_sub(self.shortfall);
        world.transfer_from(token, frame.this, frame.caller, frame.this, amount)
    }
}

impl ExternalProtocol for MockBridge {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        match selector(frame.data)? {
            IAcrossSpokePool::depositCall::SELECTOR => {
                let call: IAcrossSpokePool::depositCall = decode(frame.data)?;
                if frame.value.is_zero() {
                    self.pull(world, &frame, call.originToken, call.amount)?;
                } else {
                    require(frame.value == call.amount, "msg.value must match amount")?;
                }
            }
            ICelerBridge::sendCall::SELECTOR => {
                let call: ICelerBridge::sendCall = decode(frame.data)?;
                self.pull(world, &frame, call._token, call._amount)?;
            }
            ICelerBridge::sendNativeCall::SELECTOR => {
                let call: ICelerBridge::sendNativeCall = decode(frame.data)?;
                require(frame.value == call._amount, "Amount mismatch")?;
            }
            IStargateRouter::swapCall::SELECTOR => {
                let call: IStargateRouter::swapCall = decode(frame.data)?;
                require(!frame.value.is_zero(), "LayerZero: not enough native for fees")?;
                self.pull(world, &frame, self.token, call._amountLD)?;
            }
            IHopL1Bridge::sendToL2Call::SELECTOR => {
                let call: IHopL1Bridge::sendToL2Call = decode(frame.data)?;
                if frame.value.is_zero() {
                    self.pull(world, &frame, self.token, call.amount)?;
                } else {
                    require(frame.value == call.amount, "L1_ETH_BRG: Value does not match amount")?;
                }
            }
            _ => return Err(HostError::Revert("unknown selector".to_string())),
        }
        world.emit(frame.this, "Bridge", Bytes::copy_from_slice(frame.data));
        Ok(vec![])
    }
}
