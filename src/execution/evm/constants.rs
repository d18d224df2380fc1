use std::collections::HashSet;

use alloy_primitives::FixedBytes;
use once_cell::sync::Lazy;

use crate::execution::evm::utils::function_selector;

pub const DEFAULT_ADDRESSES_JSON: &str = include_str!("../../../config/router_addresses.json");

/// Pool functions a stableswap instruction may name. Pools come straight from the payload, so
/// only the exchange entry points are callable.
pub static STABLESWAP_SELECTORS: Lazy<HashSet<FixedBytes<4>>> = Lazy::new(|| {
    let mut set = HashSet::new();
    set.insert(function_selector("exchange(int128,int128,uint256,uint256)"));
    set.insert(function_selector("exchange_underlying(int128,int128,uint256,uint256)"));
    set.insert(function_selector("exchange(uint256,uint256,uint256,uint256)"));
    set.insert(function_selector("exchange_underlying(uint256,uint256,uint256,uint256)"));
    set
});

/// Maximum number of hops a single instruction may describe.
pub const MAX_HOPS: u8 = 8;
