use std::fmt;

use serde::{Deserialize, Serialize};

/// Low bits of the first command byte select the adapter.
pub const ADAPTER_MASK: u8 = 0x3f;
/// Set when the instruction's output feeds the next instruction instead of a recipient.
pub const CHAIN_FLAG: u8 = 0x40;

/// Adapter families known to the router.
///
/// The discriminant is the selector carried in the low 6 bits of the first command byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AdapterId {
    GenericAmm = 0x01,
    ConcentratedLiquidity = 0x02,
    Stableswap = 0x03,
    WeightedPool = 0x04,
    Across = 0x10,
    Celer = 0x11,
    Stargate = 0x12,
    Hop = 0x13,
}

impl AdapterId {
    pub const ALL: [AdapterId; 8] = [
        AdapterId::GenericAmm,
        AdapterId::ConcentratedLiquidity,
        AdapterId::Stableswap,
        AdapterId::WeightedPool,
        AdapterId::Across,
        AdapterId::Celer,
        AdapterId::Stargate,
        AdapterId::Hop,
    ];

    /// Name used for the adapter family in the address configuration.
    pub fn name(&self) -> &'static str {
        match self {
            AdapterId::GenericAmm => "generic_amm",
            AdapterId::ConcentratedLiquidity => "concentrated_liquidity",
            AdapterId::Stableswap => "stableswap",
            AdapterId::WeightedPool => "weighted_pool",
            AdapterId::Across => "across",
            AdapterId::Celer => "celer",
            AdapterId::Stargate => "stargate",
            AdapterId::Hop => "hop",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.name() == name)
    }

    /// Bridges are terminal: they produce no output amount for a following instruction.
    pub fn is_bridge(&self) -> bool {
        matches!(self, AdapterId::Across | AdapterId::Celer | AdapterId::Stargate | AdapterId::Hop)
    }
}

impl TryFrom<u8> for AdapterId {
    type Error = u8;

    fn try_from(selector: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|id| *id as u8 == selector)
            .ok_or(selector)
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A decoded 3-byte instruction header.
///
/// Decoding never fails: whether `selector` names a registered adapter is only checked at dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    /// Raw adapter selector (`byte0 & ADAPTER_MASK`).
    pub selector: u8,
    pub chained: bool,
    /// Adapter-specific routing sub-fields (fork index, pool ids, asset variant).
    pub routing: [u8; 2],
}

impl Command {
    pub fn new(adapter: AdapterId, chained: bool, routing: [u8; 2]) -> Self {
        Self { selector: adapter as u8, chained, routing }
    }

    pub fn decode(bytes: [u8; 3]) -> Self {
        Self {
            selector: bytes[0] & ADAPTER_MASK,
            chained: bytes[0] & CHAIN_FLAG != 0,
            routing: [bytes[1], bytes[2]],
        }
    }

    pub fn encode(&self) -> [u8; 3] {
        let mut first = self.selector & ADAPTER_MASK;
        if self.chained {
            first |= CHAIN_FLAG;
        }
        [first, self.routing[0], self.routing[1]]
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case([0x01, 0x00, 0x00], 0x01, false, [0, 0])]
    #[case([0x41, 0x01, 0x00], 0x01, true, [1, 0])]
    #[case([0x12, 0x01, 0x02], 0x12, false, [1, 2])]
    #[case([0xd3, 0x00, 0x07], 0x13, true, [0, 7])]
    fn test_decode_command(
        #[case] bytes: [u8; 3],
        #[case] selector: u8,
        #[case] chained: bool,
        #[case] routing: [u8; 2],
    ) {
        let command = Command::decode(bytes);
        assert_eq!(command.selector, selector);
        assert_eq!(command.chained, chained);
        assert_eq!(command.routing, routing);
    }

    #[test]
    fn test_encode_command() {
        let command = Command::new(AdapterId::Stableswap, true, [0, 0]);
        assert_eq!(command.encode(), [0x43, 0x00, 0x00]);
        assert_eq!(Command::decode(command.encode()), command);
    }

    #[test]
    fn test_unknown_selector_has_no_adapter() {
        let command = Command::decode([0x3f, 0x00, 0x00]);
        assert_eq!(AdapterId::try_from(command.selector), Err(0x3f));
    }

    #[test]
    fn test_adapter_names_round_trip() {
        for id in AdapterId::ALL {
            assert_eq!(AdapterId::from_name(id.name()), Some(id));
        }
        assert!(AdapterId::Hop.is_bridge());
        assert!(!AdapterId::WeightedPool.is_bridge());
    }
}
