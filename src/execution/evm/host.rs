//! In-process model of the chain state the router executes against.
//!
//! The `World` holds every piece of mutable state that an external call can touch (balances,
//! allowances, logs), so cloning it is a complete snapshot. External protocols are black boxes
//! registered on the `Host` at their address; they receive raw calldata and the `World`, never the
//! router, so they cannot re-enter it.

use std::collections::HashMap;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use thiserror::Error;

use crate::execution::{
    errors::ExecutionError, evm::adapters::interfaces::IWrappedNative,
};

#[derive(Error, Debug, PartialEq)]
pub enum HostError {
    #[error("insufficient balance of {token} held by {holder}: {available} < {required}")]
    InsufficientBalance { token: Address, holder: Address, available: U256, required: U256 },
    #[error("insufficient allowance of {token} from {owner} to {spender}: {available} < {required}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        available: U256,
        required: U256,
    },
    #[error("no contract deployed at {0}")]
    UnknownContract(Address),
    #[error("reverted: {0}")]
    Revert(String),
}

impl HostError {
    pub fn into_execution_error(self, target: Address) -> ExecutionError {
        ExecutionError::ExternalFailure { target, reason: self.to_string() }
    }
}

/// A record emitted by an external contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub emitter: Address,
    pub name: String,
    pub data: Bytes,
}

/// Balances, allowances and logs. The zero address as token stands for native currency.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct World {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    logs: Vec<Log>,
    timestamp: u64,
}

impl World {
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: U256) {
        *self
            .balances
            .entry((token, to))
            .or_default() += amount;
    }

    pub fn burn(&mut self, token: Address, from: Address, amount: U256) -> Result<(), HostError> {
        self.debit(token, from, amount)
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        self.debit(token, from, amount)?;
        self.mint(token, to, amount);
        Ok(())
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .insert((token, owner, spender), amount);
    }

    /// Moves `amount` of `token` from `from` to `to` on behalf of `spender`, consuming allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        if token == Address::ZERO {
            return Err(HostError::Revert("native currency has no allowance".to_string()));
        }
        if spender != from {
            let available = self.allowance(token, from, spender);
            if available < amount {
                return Err(HostError::InsufficientAllowance {
                    token,
                    owner: from,
                    spender,
                    available,
                    required: amount,
                });
            }
            self.approve(token, from, spender, available - amount);
        }
        self.transfer(token, from, to, amount)
    }

    pub fn emit(&mut self, emitter: Address, name: &str, data: impl Into<Bytes>) {
        self.logs.push(Log { emitter, name: name.to_string(), data: data.into() });
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    fn debit(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), HostError> {
        let available = self.balance_of(token, holder);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                token,
                holder,
                available,
                required: amount,
            });
        }
        self.balances
            .insert((token, holder), available - amount);
        Ok(())
    }
}

/// The environment of one call into an external contract.
#[derive(Clone, Copy, Debug)]
pub struct CallFrame<'a> {
    pub caller: Address,
    /// Address the contract is deployed at.
    pub this: Address,
    /// Native currency already credited to `this` for the call.
    pub value: U256,
    pub data: &'a [u8],
}

/// A contract the router can call. Implementations stand in for external exchanges and bridges.
pub trait ExternalProtocol: Send + Sync {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError>;
}

/// Chain state plus the contracts deployed on it.
#[derive(Default)]
pub struct Host {
    world: World,
    contracts: HashMap<Address, Box<dyn ExternalProtocol>>,
}

impl Host {
    pub fn new(timestamp: u64) -> Self {
        let mut host = Self::default();
        host.world.set_timestamp(timestamp);
        host
    }

    pub fn deploy<P: ExternalProtocol + 'static>(&mut self, address: Address, contract: P) {
        self.contracts
            .insert(address, Box::new(contract));
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Calls `target`, crediting `value` of native currency to it first.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: U256,
        data: &[u8],
    ) -> Result<Vec<u8>, HostError> {
        let contract = self
            .contracts
            .get(&target)
            .ok_or(HostError::UnknownContract(target))?;
        if !value.is_zero() {
            self.world
                .transfer(Address::ZERO, caller, target, value)?;
        }
        contract.call(CallFrame { caller, this: target, value, data }, &mut self.world)
    }

    pub fn snapshot(&self) -> World {
        self.world.clone()
    }

    pub fn restore(&mut self, snapshot: World) {
        self.world = snapshot;
    }
}

/// Reads the function selector of raw calldata.
pub fn selector(data: &[u8]) -> Result<[u8; 4], HostError> {
    data.get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| HostError::Revert("missing selector".to_string()))
}

/// The wrapped-native asset contract: 1:1 native currency ⇄ token held at its own address.
#[derive(Clone, Copy, Debug, Default)]
pub struct WrappedNative;

impl ExternalProtocol for WrappedNative {
    fn call(&self, frame: CallFrame<'_>, world: &mut World) -> Result<Vec<u8>, HostError> {
        match selector(frame.data)? {
            IWrappedNative::depositCall::SELECTOR => {
                world.mint(frame.this, frame.caller, frame.value);
                Ok(vec![])
            }
            IWrappedNative::withdrawCall::SELECTOR => {
                let call = IWrappedNative::withdrawCall::abi_decode(frame.data, true)
                    .map_err(|e| HostError::Revert(e.to_string()))?;
                world.burn(frame.this, frame.caller, call.wad)?;
                world.transfer(Address::ZERO, frame.this, frame.caller, call.wad)?;
                Ok(vec![])
            }
            _ => Err(HostError::Revert("unknown selector".to_string())),
        }
    }
}
