use alloy_primitives::{keccak256, FixedBytes, U256};
use num_bigint::BigUint;

use crate::execution::errors::ExecutionError;

/// Converts a `BigUint` into a `U256`, failing if the value does not fit in 256 bits.
pub fn biguint_to_u256(value: &BigUint) -> Result<U256, ExecutionError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ExecutionError::InvalidInput(format!("Value {} exceeds 256 bits", value)));
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Returns the 4-byte selector of a function signature such as `exchange(int128,int128,uint256,uint256)`.
pub fn function_selector(signature: &str) -> FixedBytes<4> {
    let hash = keccak256(signature.as_bytes());
    FixedBytes::<4>::from([hash[0], hash[1], hash[2], hash[3]])
}

/// Applies a basis-point rate to an amount, rounding down.
pub fn apply_bps(amount: U256, bps: u16) -> U256 {
    amount * U256::from(bps) / U256::from(10_000u64)
}
