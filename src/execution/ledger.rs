use std::collections::{BTreeSet, HashMap};

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::execution::{
    errors::ExecutionError, evm::utils::apply_bps, serde_primitives::u256_string,
};

/// Upper bound for the sum of protocol and partner fee rates, in basis points.
pub const MAX_FEE_BPS: u16 = 1_000;

/// Per (partner, asset) fee account.
///
/// Invariant: `balance == rewarded - withdrawn`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PartnerToken {
    #[serde(with = "u256_string")]
    pub balance: U256,
    #[serde(with = "u256_string")]
    pub rewarded: U256,
    #[serde(with = "u256_string")]
    pub withdrawn: U256,
}

/// A fee-earning integrator.
///
/// Reward and withdrawal totals are kept per asset on [`PartnerToken`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Partner {
    pub fee_bps: u16,
    /// Number of fee attributions received.
    pub reward_count: u64,
    /// Number of withdrawals performed.
    pub withdrawal_count: u64,
    /// Assets the partner has been rewarded in.
    pub assets: BTreeSet<Address>,
}

/// Split of a gross swap output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub protocol_fee: U256,
    pub partner_fee: U256,
    pub net: U256,
}

/// Accrued protocol and partner fees held in router custody.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeLedger {
    protocol_fee_bps: u16,
    partners: HashMap<Address, Partner>,
    partner_tokens: HashMap<(Address, Address), PartnerToken>,
    protocol_fees: HashMap<Address, U256>,
}

impl FeeLedger {
    pub fn new(protocol_fee_bps: u16) -> Result<Self, ExecutionError> {
        check_fee_bps(protocol_fee_bps, 0)?;
        Ok(Self { protocol_fee_bps, ..Default::default() })
    }

    pub fn protocol_fee_bps(&self) -> u16 {
        self.protocol_fee_bps
    }

    pub fn set_protocol_fee_bps(&mut self, bps: u16) -> Result<(), ExecutionError> {
        let max_partner = self
            .partners
            .values()
            .map(|partner| partner.fee_bps)
            .max()
            .unwrap_or(0);
        check_fee_bps(bps, max_partner)?;
        self.protocol_fee_bps = bps;
        Ok(())
    }

    /// Registers a partner or updates its fee rate.
    pub fn register_partner(&mut self, partner: Address, fee_bps: u16) -> Result<(), ExecutionError> {
        if partner == Address::ZERO {
            return Err(ExecutionError::InvalidInput("Partner cannot be the zero address".into()));
        }
        check_fee_bps(self.protocol_fee_bps, fee_bps)?;
        self.partners
            .entry(partner)
            .or_default()
            .fee_bps = fee_bps;
        Ok(())
    }

    pub fn partner(&self, partner: &Address) -> Option<&Partner> {
        self.partners.get(partner)
    }

    pub fn partner_token(&self, partner: &Address, asset: &Address) -> Option<&PartnerToken> {
        self.partner_tokens
            .get(&(*partner, *asset))
    }

    pub fn protocol_fees(&self, asset: &Address) -> U256 {
        self.protocol_fees
            .get(asset)
            .copied()
            .unwrap_or_default()
    }

    /// Total fees owed in `asset`, i.e. the part of the router's balance that is not its own.
    pub fn liabilities(&self, asset: &Address) -> U256 {
        self.partner_tokens
            .iter()
            .filter(|((_, token), _)| token == asset)
            .fold(self.protocol_fees(asset), |acc, (_, account)| acc + account.balance)
    }

    /// Computes the fee split of a gross output. Unregistered partners earn nothing.
    pub fn quote(&self, gross: U256, partner: Option<Address>) -> FeeSplit {
        let protocol_fee = apply_bps(gross, self.protocol_fee_bps);
        let partner_fee = partner
            .and_then(|partner| self.partners.get(&partner))
            .map(|partner| apply_bps(gross, partner.fee_bps))
            .unwrap_or_default();
        FeeSplit { protocol_fee, partner_fee, net: gross - protocol_fee - partner_fee }
    }

    /// Records a fee split previously obtained from `quote`.
    pub fn accrue(&mut self, asset: Address, partner: Option<Address>, split: &FeeSplit) {
        if !split.protocol_fee.is_zero() {
            *self
                .protocol_fees
                .entry(asset)
                .or_default() += split.protocol_fee;
        }
        if split.partner_fee.is_zero() {
            return;
        }
        let Some(partner) = partner else { return };
        if let Some(entry) = self.partners.get_mut(&partner) {
            entry.reward_count += 1;
            entry.assets.insert(asset);
        }
        let account = self
            .partner_tokens
            .entry((partner, asset))
            .or_default();
        account.rewarded += split.partner_fee;
        account.balance += split.partner_fee;
    }

    /// Debits the whole partner balance in `asset` and returns it.
    pub fn withdraw_partner(&mut self, partner: Address, asset: Address) -> U256 {
        let Some(account) = self
            .partner_tokens
            .get_mut(&(partner, asset))
        else {
            return U256::ZERO;
        };
        let amount = account.balance;
        if amount.is_zero() {
            return amount;
        }
        account.withdrawn += amount;
        account.balance = U256::ZERO;
        if let Some(entry) = self.partners.get_mut(&partner) {
            entry.withdrawal_count += 1;
        }
        amount
    }

    /// Debits the whole protocol balance in `asset` and returns it.
    pub fn withdraw_protocol(&mut self, asset: Address) -> U256 {
        self.protocol_fees
            .remove(&asset)
            .unwrap_or_default()
    }
}

fn check_fee_bps(protocol_fee_bps: u16, partner_fee_bps: u16) -> Result<(), ExecutionError> {
    if u32::from(protocol_fee_bps) + u32::from(partner_fee_bps) > u32::from(MAX_FEE_BPS) {
        return Err(ExecutionError::InvalidInput(format!(
            "Combined fee of {} bps exceeds the maximum of {} bps",
            u32::from(protocol_fee_bps) + u32::from(partner_fee_bps),
            MAX_FEE_BPS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partner() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn usdc() -> Address {
        Address::repeat_byte(0x0c)
    }

    fn assert_invariant(ledger: &FeeLedger) {
        for account in ledger.partner_tokens.values() {
            assert_eq!(account.balance, account.rewarded - account.withdrawn);
        }
    }

    #[test]
    fn test_quote_without_partner() {
        let ledger = FeeLedger::new(30).unwrap();
        let split = ledger.quote(U256::from(1_000_000u64), None);
        assert_eq!(split.protocol_fee, U256::from(3_000u64));
        assert_eq!(split.partner_fee, U256::ZERO);
        assert_eq!(split.net, U256::from(997_000u64));
    }

    #[test]
    fn test_unregistered_partner_earns_nothing() {
        let ledger = FeeLedger::new(30).unwrap();
        let split = ledger.quote(U256::from(1_000_000u64), Some(partner()));
        assert_eq!(split.partner_fee, U256::ZERO);
    }

    #[test]
    fn test_accrue_and_withdraw_keeps_invariant() {
        let mut ledger = FeeLedger::new(30).unwrap();
        ledger
            .register_partner(partner(), 20)
            .unwrap();

        for gross in [1_000_000u64, 250_000, 42] {
            let split = ledger.quote(U256::from(gross), Some(partner()));
            ledger.accrue(usdc(), Some(partner()), &split);
            assert_invariant(&ledger);
        }
        let account = ledger
            .partner_token(&partner(), &usdc())
            .unwrap()
            .clone();
        assert_eq!(account.rewarded, U256::from(2_000u64 + 500));
        assert_eq!(ledger.liabilities(&usdc()), U256::from(2_500u64 + 3_000 + 750));

        let withdrawn = ledger.withdraw_partner(partner(), usdc());
        assert_eq!(withdrawn, U256::from(2_500u64));
        assert_invariant(&ledger);
        assert_eq!(
            ledger
                .partner_token(&partner(), &usdc())
                .unwrap()
                .withdrawn,
            U256::from(2_500u64)
        );
        let entry = ledger.partner(&partner()).unwrap();
        assert_eq!(entry.reward_count, 2);
        assert_eq!(entry.withdrawal_count, 1);

        assert_eq!(ledger.withdraw_partner(partner(), usdc()), U256::ZERO);
        assert_eq!(ledger.withdraw_protocol(usdc()), U256::from(3_750u64));
        assert_eq!(ledger.liabilities(&usdc()), U256::ZERO);
    }

    #[test]
    fn test_fee_bounds() {
        assert!(FeeLedger::new(MAX_FEE_BPS + 1).is_err());
        let mut ledger = FeeLedger::new(900).unwrap();
        assert!(ledger
            .register_partner(partner(), 200)
            .is_err());
        ledger
            .register_partner(partner(), 100)
            .unwrap();
        assert!(ledger.set_protocol_fee_bps(901).is_err());
        assert!(ledger
            .register_partner(Address::ZERO, 1)
            .is_err());
    }
}
