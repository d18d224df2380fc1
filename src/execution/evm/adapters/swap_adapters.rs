use std::collections::BTreeSet;

use alloy_primitives::{
    aliases::{U160, U24},
    Address, Bytes, I256, U256,
};
use alloy_sol_types::{SolCall, SolValue};
use tracing::debug;

use crate::execution::{
    codec::PayloadWriter,
    command::{AdapterId, Command},
    errors::ExecutionError,
    evm::adapters::{
        check_amount_out, entry_point,
        interfaces::{IBalancerVault, ISwapRouter, IUniswapV2Router02, GIVEN_IN},
        mismatched,
        payloads::{AmmSwap, ConcentratedSwap, StableSwap, WeightedSwap},
        Adapter, AdapterContext, Instruction,
    },
    models::Outcome,
};

/// Swaps through a Uniswap V2 style router and its forks.
///
/// # Fields
/// * `routers` - Router of each supported fork, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct GenericAmmAdapter {
    routers: Vec<Address>,
}

impl GenericAmmAdapter {
    pub fn new(routers: Vec<Address>) -> Self {
        Self { routers }
    }
}

impl Adapter for GenericAmmAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::GenericAmm
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        let router = entry_point(self.id(), &self.routers, command.routing[0])?;
        let mut swap = AmmSwap::decode(payload)?;
        if let Some(amount) = amount_override {
            swap.amount_in = amount;
        }
        Ok(Instruction::GenericAmm { router, swap })
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let Instruction::GenericAmm { router, swap } = instruction else {
            return Err(mismatched(self.id(), instruction));
        };
        let (Some(&asset_in), Some(&asset_out)) = (swap.path.first(), swap.path.last()) else {
            return Err(ExecutionError::Decode("Empty swap path".to_string()));
        };
        // Routers only know the wrapped asset; native legs go through the ETH entry points.
        let wrapped_native = ctx.wrapped_native;
        let path: Vec<Address> = swap
            .path
            .iter()
            .map(|asset| if *asset == Address::ZERO { wrapped_native } else { *asset })
            .collect();
        let to = ctx.router;
        let deadline = ctx.deadline();
        let router = *router;

        let amount_out = ctx.measure_output((asset_in, swap.amount_in), asset_out, |ctx| {
            if asset_in == Address::ZERO {
                let data = IUniswapV2Router02::swapExactETHForTokensCall {
                    amountOutMin: swap.amount_out_min,
                    path,
                    to,
                    deadline,
                }
                .abi_encode();
                ctx.call(router, swap.amount_in, &data)?;
                return Ok(());
            }
            let data = if asset_out == Address::ZERO {
                IUniswapV2Router02::swapExactTokensForETHCall {
                    amountIn: swap.amount_in,
                    amountOutMin: swap.amount_out_min,
                    path,
                    to,
                    deadline,
                }
                .abi_encode()
            } else {
                IUniswapV2Router02::swapExactTokensForTokensCall {
                    amountIn: swap.amount_in,
                    amountOutMin: swap.amount_out_min,
                    path,
                    to,
                    deadline,
                }
                .abi_encode()
            };
            ctx.with_approval(asset_in, router, swap.amount_in, |ctx| {
                ctx.call(router, U256::ZERO, &data)
            })?;
            Ok(())
        })?;
        check_amount_out(amount_out, swap.amount_out_min)?;
        debug!(adapter = %self.id(), %router, %asset_out, %amount_out, "Swap completed");
        Ok(Outcome::Swapped { asset_out, amount_out })
    }
}

/// Swaps through a Uniswap V3 style `SwapRouter`.
///
/// # Fields
/// * `routers` - Router of each supported fork, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct ConcentratedLiquidityAdapter {
    routers: Vec<Address>,
}

impl ConcentratedLiquidityAdapter {
    pub fn new(routers: Vec<Address>) -> Self {
        Self { routers }
    }

    fn fee_tier(fee: u32) -> Result<U24, ExecutionError> {
        if fee > 0x00ff_ffff {
            return Err(ExecutionError::InvalidInput(format!("Fee tier {} exceeds 24 bits", fee)));
        }
        Ok(U24::from(fee))
    }
}

impl Adapter for ConcentratedLiquidityAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::ConcentratedLiquidity
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        let router = entry_point(self.id(), &self.routers, command.routing[0])?;
        let mut swap = ConcentratedSwap::decode(payload)?;
        if let Some(amount) = amount_override {
            swap.amount_in = amount;
        }
        Ok(Instruction::ConcentratedLiquidity { router, swap })
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let Instruction::ConcentratedLiquidity { router, swap } = instruction else {
            return Err(mismatched(self.id(), instruction));
        };
        let router = *router;
        let token_in = if swap.token_in == Address::ZERO {
            ctx.wrap(swap.amount_in)?;
            ctx.wrapped_native
        } else {
            swap.token_in
        };
        let token_out = swap.token_out();
        let recipient = ctx.router;
        let deadline = ctx.deadline();

        let data = match swap.hops.as_slice() {
            [] => return Err(ExecutionError::Decode("Empty pool path".to_string())),
            [hop] => ISwapRouter::exactInputSingleCall {
                params: ISwapRouter::ExactInputSingleParams {
                    tokenIn: token_in,
                    tokenOut: hop.token_out,
                    fee: Self::fee_tier(hop.fee)?,
                    recipient,
                    deadline,
                    amountIn: swap.amount_in,
                    amountOutMinimum: swap.amount_out_min,
                    sqrtPriceLimitX96: U160::ZERO,
                },
            }
            .abi_encode(),
            hops => {
                let mut path = PayloadWriter::new().address(token_in);
                for hop in hops {
                    path = path
                        .uint(u64::from(hop.fee), 3)?
                        .address(hop.token_out);
                }
                ISwapRouter::exactInputCall {
                    params: ISwapRouter::ExactInputParams {
                        path: Bytes::from(path.build()),
                        recipient,
                        deadline,
                        amountIn: swap.amount_in,
                        amountOutMinimum: swap.amount_out_min,
                    },
                }
                .abi_encode()
            }
        };

        let amount_out = ctx.measure_output((token_in, swap.amount_in), token_out, |ctx| {
            ctx.with_approval(token_in, router, swap.amount_in, |ctx| {
                ctx.call(router, U256::ZERO, &data)
            })?;
            Ok(())
        })?;
        check_amount_out(amount_out, swap.amount_out_min)?;
        debug!(adapter = %self.id(), %router, asset_out = %token_out, %amount_out, "Swap completed");
        Ok(Outcome::Swapped { asset_out: token_out, amount_out })
    }
}

/// Exchanges on Curve style stableswap pools addressed directly by the payload.
#[derive(Clone, Debug, Default)]
pub struct StableswapAdapter;

impl StableswapAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for StableswapAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::Stableswap
    }

    fn decode(
        &self,
        _command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        let mut swap = StableSwap::decode(payload)?;
        if let Some(amount) = amount_override {
            swap.amount_in = amount;
        }
        Ok(Instruction::Stableswap { swap })
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let Instruction::Stableswap { swap } = instruction else {
            return Err(mismatched(self.id(), instruction));
        };
        let mut asset = swap.asset_in;
        let mut amount = swap.amount_in;
        for (position, hop) in swap.hops.iter().enumerate() {
            let min_dy =
                if position + 1 == swap.hops.len() { swap.amount_out_min } else { U256::ZERO };
            let args = (U256::from(hop.i), U256::from(hop.j), amount, min_dy).abi_encode();
            let data = [hop.selector.as_slice(), args.as_slice()].concat();
            let value = if asset == Address::ZERO { amount } else { U256::ZERO };
            let (asset_in, amount_in) = (asset, amount);

            amount = ctx.measure_output((asset_in, amount_in), hop.asset_out, |ctx| {
                ctx.with_approval(asset_in, hop.pool, amount_in, |ctx| {
                    ctx.call(hop.pool, value, &data)
                })?;
                Ok(())
            })?;
            asset = hop.asset_out;
            debug!(pool = %hop.pool, %asset, %amount, "Stableswap hop completed");
        }
        check_amount_out(amount, swap.amount_out_min)?;
        Ok(Outcome::Swapped { asset_out: asset, amount_out: amount })
    }
}

/// Swaps through a Balancer V2 style vault.
///
/// # Fields
/// * `vaults` - Vault addresses, selected by the first routing byte.
#[derive(Clone, Debug)]
pub struct WeightedPoolAdapter {
    vaults: Vec<Address>,
}

impl WeightedPoolAdapter {
    pub fn new(vaults: Vec<Address>) -> Self {
        Self { vaults }
    }

    fn batch_swap_call(
        swap: &WeightedSwap,
        funds: IBalancerVault::FundManagement,
        deadline: U256,
    ) -> Result<Vec<u8>, ExecutionError> {
        let assets: Vec<Address> = swap
            .hops
            .iter()
            .flat_map(|hop| [hop.asset_in, hop.asset_out])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index_of = |asset: Address| {
            assets
                .iter()
                .position(|candidate| *candidate == asset)
                .unwrap_or_default()
        };
        let swaps = swap
            .hops
            .iter()
            .enumerate()
            .map(|(position, hop)| IBalancerVault::BatchSwapStep {
                poolId: hop.pool_id,
                assetInIndex: U256::from(index_of(hop.asset_in)),
                assetOutIndex: U256::from(index_of(hop.asset_out)),
                // Later steps spend whatever the previous step produced.
                amount: if position == 0 { swap.amount_in } else { U256::ZERO },
                userData: hop.user_data.clone(),
            })
            .collect();

        let to_signed = |amount: U256| {
            I256::try_from(amount).map_err(|_| {
                ExecutionError::InvalidInput(format!("Amount {} exceeds the signed range", amount))
            })
        };
        // A route back to its input asset nets both bounds on the same slot.
        let mut limits = vec![I256::ZERO; assets.len()];
        limits[index_of(swap.asset_in())] = to_signed(swap.amount_in)?;
        let out = index_of(swap.asset_out());
        limits[out] = limits[out] - to_signed(swap.amount_out_min)?;

        Ok(IBalancerVault::batchSwapCall { kind: GIVEN_IN, swaps, assets, funds, limits, deadline }
            .abi_encode())
    }
}

impl Adapter for WeightedPoolAdapter {
    fn id(&self) -> AdapterId {
        AdapterId::WeightedPool
    }

    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError> {
        let vault = entry_point(self.id(), &self.vaults, command.routing[0])?;
        let mut swap = WeightedSwap::decode(payload)?;
        if let Some(amount) = amount_override {
            swap.amount_in = amount;
        }
        Ok(Instruction::WeightedPool { vault, swap })
    }

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError> {
        let Instruction::WeightedPool { vault, swap } = instruction else {
            return Err(mismatched(self.id(), instruction));
        };
        let vault = *vault;
        let funds = IBalancerVault::FundManagement {
            sender: ctx.router,
            fromInternalBalance: false,
            recipient: ctx.router,
            toInternalBalance: false,
        };
        let deadline = ctx.deadline();
        let data = match swap.hops.as_slice() {
            [] => return Err(ExecutionError::Decode("Empty pool route".to_string())),
            [hop] => IBalancerVault::swapCall {
                singleSwap: IBalancerVault::SingleSwap {
                    poolId: hop.pool_id,
                    kind: GIVEN_IN,
                    assetIn: hop.asset_in,
                    assetOut: hop.asset_out,
                    amount: swap.amount_in,
                    userData: hop.user_data.clone(),
                },
                funds,
                limit: swap.amount_out_min,
                deadline,
            }
            .abi_encode(),
            _ => Self::batch_swap_call(swap, funds, deadline)?,
        };

        // The vault treats the zero address as native currency itself.
        let asset_in = swap.asset_in();
        let asset_out = swap.asset_out();
        let value = if asset_in == Address::ZERO { swap.amount_in } else { U256::ZERO };
        let amount_out = ctx.measure_output((asset_in, swap.amount_in), asset_out, |ctx| {
            ctx.with_approval(asset_in, vault, swap.amount_in, |ctx| ctx.call(vault, value, &data))?;
            Ok(())
        })?;
        check_amount_out(amount_out, swap.amount_out_min)?;
        debug!(adapter = %self.id(), %vault, %asset_out, %amount_out, "Swap completed");
        Ok(Outcome::Swapped { asset_out, amount_out })
    }
}
