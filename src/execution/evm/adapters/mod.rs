pub mod adapter_registry;
pub mod bridge_adapters;
pub mod builder;
pub mod interfaces;
pub mod payloads;
pub mod swap_adapters;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;

use crate::execution::{
    command::{AdapterId, Command},
    errors::ExecutionError,
    evm::{
        adapters::{
            interfaces::IWrappedNative,
            payloads::{
                AmmSwap, BridgeFields, BridgeTransfer, ConcentratedSwap, StableSwap, WeightedSwap,
            },
        },
        host::Host,
    },
    models::Outcome,
};

/// A handler for one external protocol family.
///
/// Handling an instruction is split in two so the router can put the input in custody between
/// the steps: `decode` turns the payload into an `Instruction` (resolving routing indices against
/// the address table), `call` performs the external call with the router holding `amount_in`.
pub trait Adapter: Send + Sync {
    fn id(&self) -> AdapterId;

    /// Decodes `payload`. When `amount_override` is set it replaces the payload's amount-in.
    fn decode(
        &self,
        command: &Command,
        payload: &[u8],
        amount_override: Option<U256>,
    ) -> Result<Instruction, ExecutionError>;

    fn call(
        &self,
        instruction: &Instruction,
        ctx: &mut AdapterContext<'_>,
    ) -> Result<Outcome, ExecutionError>;
}

/// A decoded instruction with its external entry point resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    GenericAmm { router: Address, swap: AmmSwap },
    ConcentratedLiquidity { router: Address, swap: ConcentratedSwap },
    Stableswap { swap: StableSwap },
    WeightedPool { vault: Address, swap: WeightedSwap },
    Bridge { target: Address, routing: [u8; 2], transfer: BridgeTransfer },
}

impl Instruction {
    pub fn adapter(&self) -> AdapterId {
        match self {
            Instruction::GenericAmm { .. } => AdapterId::GenericAmm,
            Instruction::ConcentratedLiquidity { .. } => AdapterId::ConcentratedLiquidity,
            Instruction::Stableswap { .. } => AdapterId::Stableswap,
            Instruction::WeightedPool { .. } => AdapterId::WeightedPool,
            Instruction::Bridge { transfer, .. } => transfer.fields.adapter(),
        }
    }

    /// Asset the router must hold before the call; the zero address is native currency.
    pub fn asset_in(&self) -> Address {
        match self {
            Instruction::GenericAmm { swap, .. } => swap
                .path
                .first()
                .copied()
                .unwrap_or_default(),
            Instruction::ConcentratedLiquidity { swap, .. } => swap.token_in,
            Instruction::Stableswap { swap } => swap.asset_in,
            Instruction::WeightedPool { swap, .. } => swap.asset_in(),
            Instruction::Bridge { transfer, .. } => transfer.asset,
        }
    }

    pub fn amount_in(&self) -> U256 {
        match self {
            Instruction::GenericAmm { swap, .. } => swap.amount_in,
            Instruction::ConcentratedLiquidity { swap, .. } => swap.amount_in,
            Instruction::Stableswap { swap } => swap.amount_in,
            Instruction::WeightedPool { swap, .. } => swap.amount_in,
            Instruction::Bridge { transfer, .. } => transfer.amount,
        }
    }

    /// Minimum output for swaps; zero for bridges.
    pub fn amount_out_min(&self) -> U256 {
        match self {
            Instruction::GenericAmm { swap, .. } => swap.amount_out_min,
            Instruction::ConcentratedLiquidity { swap, .. } => swap.amount_out_min,
            Instruction::Stableswap { swap } => swap.amount_out_min,
            Instruction::WeightedPool { swap, .. } => swap.amount_out_min,
            Instruction::Bridge { .. } => U256::ZERO,
        }
    }

    /// Explicit recipient of a swap output. Bridge recipients live on the destination chain.
    pub fn recipient(&self) -> Option<Address> {
        match self {
            Instruction::GenericAmm { swap, .. } => swap.recipient,
            Instruction::ConcentratedLiquidity { swap, .. } => swap.recipient,
            Instruction::Stableswap { swap } => swap.recipient,
            Instruction::WeightedPool { swap, .. } => swap.recipient,
            Instruction::Bridge { .. } => None,
        }
    }

    /// Native currency paid to the external protocol on top of `amount_in`.
    pub fn native_fee(&self) -> U256 {
        match self {
            Instruction::Bridge {
                transfer: BridgeTransfer { fields: BridgeFields::Stargate { lz_fee, .. }, .. },
                ..
            } => *lz_fee,
            _ => U256::ZERO,
        }
    }
}

/// What an adapter sees of the chain while handling an instruction.
pub struct AdapterContext<'a> {
    pub host: &'a mut Host,
    /// The router's own address; it holds the input and receives every swap output.
    pub router: Address,
    /// Caller of the top-level invocation.
    pub sender: Address,
    pub wrapped_native: Address,
}

impl<'a> AdapterContext<'a> {
    pub fn new(host: &'a mut Host, router: Address, sender: Address, wrapped_native: Address) -> Self {
        Self { host, router, sender, wrapped_native }
    }

    pub fn balance(&self, asset: Address) -> U256 {
        self.host
            .world()
            .balance_of(asset, self.router)
    }

    /// Deadline passed to protocols that take one: the current block.
    pub fn deadline(&self) -> U256 {
        U256::from(self.host.world().timestamp())
    }

    /// Calls `target` from the router, attaching `value` of native currency.
    pub fn call(
        &mut self,
        target: Address,
        value: U256,
        data: &[u8],
    ) -> Result<Vec<u8>, ExecutionError> {
        self.host
            .call(self.router, target, value, data)
            .map_err(|e| e.into_execution_error(target))
    }

    /// Lets `spender` pull `amount` of `token` for the duration of `f`, then revokes the allowance.
    pub fn with_approval<T, F>(
        &mut self,
        token: Address,
        spender: Address,
        amount: U256,
        f: F,
    ) -> Result<T, ExecutionError>
    where
        F: FnOnce(&mut Self) -> Result<T, ExecutionError>,
    {
        if token == Address::ZERO {
            return f(self);
        }
        self.host
            .world_mut()
            .approve(token, self.router, spender, amount);
        let result = f(self);
        self.host
            .world_mut()
            .approve(token, self.router, spender, U256::ZERO);
        result
    }

    /// Runs `f`, which spends `amount_in` of `asset_in`, and returns how much `asset_out` it
    /// delivered to the router.
    pub fn measure_output<F>(
        &mut self,
        (asset_in, amount_in): (Address, U256),
        asset_out: Address,
        f: F,
    ) -> Result<U256, ExecutionError>
    where
        F: FnOnce(&mut Self) -> Result<(), ExecutionError>,
    {
        let before = self.balance(asset_out);
        f(self)?;
        // A route that closes on its input asset pays `amount_in` out of the measured balance.
        let spent = if asset_in == asset_out { amount_in } else { U256::ZERO };
        Ok(self
            .balance(asset_out)
            .saturating_add(spent)
            .saturating_sub(before))
    }

    /// Converts `amount` of the router's native currency into the wrapped-native asset.
    pub fn wrap(&mut self, amount: U256) -> Result<(), ExecutionError> {
        let wrapped_native = self.wrapped_native;
        self.call(wrapped_native, amount, &IWrappedNative::depositCall {}.abi_encode())?;
        Ok(())
    }
}

/// Fails with `Slippage` when a measured output is below the instruction's bound.
pub fn check_amount_out(amount_out: U256, amount_out_min: U256) -> Result<(), ExecutionError> {
    if amount_out < amount_out_min {
        return Err(ExecutionError::Slippage { amount_out, amount_out_min });
    }
    Ok(())
}

/// Resolves the entry point selected by a routing index among an adapter's configured addresses.
pub(crate) fn entry_point(
    adapter: AdapterId,
    entry_points: &[Address],
    index: u8,
) -> Result<Address, ExecutionError> {
    entry_points
        .get(index as usize)
        .copied()
        .ok_or_else(|| {
            ExecutionError::Decode(format!("No {} entry point at routing index {}", adapter, index))
        })
}

pub(crate) fn mismatched(adapter: AdapterId, instruction: &Instruction) -> ExecutionError {
    ExecutionError::FatalError(format!(
        "{} adapter cannot handle a {} instruction",
        adapter,
        instruction.adapter()
    ))
}
