//! Supply conservation audit.
//!
//! ```text
//! for every asset: sum(available + locked) == deposits - withdrawals
//! ```
//!
//! Locking, unlocking and settling only move funds between records, so
//! the invariant holds after any sequence of book operations.

use std::collections::{BTreeSet, HashMap};

use hookmatch_types::{Asset, HookmatchError, Result};
use rust_decimal::Decimal;

/// Per-asset deposit and withdrawal totals.
#[derive(Debug, Clone, Default)]
pub struct SupplyAudit {
    deposits: HashMap<Asset, Decimal>,
    withdrawals: HashMap<Asset, Decimal>,
}

impl SupplyAudit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, asset: &str, amount: Decimal) {
        *self.deposits.entry(asset.to_string()).or_default() += amount;
    }

    pub fn record_withdrawal(&mut self, asset: &str, amount: Decimal) {
        *self.withdrawals.entry(asset.to_string()).or_default() += amount;
    }

    #[must_use]
    pub fn total_deposits(&self, asset: &str) -> Decimal {
        self.deposits.get(asset).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: &str) -> Decimal {
        self.withdrawals.get(asset).copied().unwrap_or_default()
    }

    /// Deposits minus withdrawals.
    #[must_use]
    pub fn expected_supply(&self, asset: &str) -> Decimal {
        self.total_deposits(asset) - self.total_withdrawals(asset)
    }

    /// Compare `actual_supply` against what custody flows allow.
    ///
    /// # Errors
    /// [`HookmatchError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, asset: &str, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(HookmatchError::SupplyInvariantViolation {
                reason: format!(
                    "asset {asset}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(asset),
                    self.total_withdrawals(asset),
                ),
            });
        }
        Ok(())
    }

    /// Every asset that has seen a deposit or withdrawal, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<Asset> {
        let assets: BTreeSet<&Asset> = self.deposits.keys().chain(self.withdrawals.keys()).collect();
        assets.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn expected_supply_tracks_flows() {
        let mut audit = SupplyAudit::new();
        audit.record_deposit("BTC", dec(10));
        audit.record_deposit("BTC", dec(5));
        audit.record_withdrawal("BTC", dec(3));
        assert_eq!(audit.expected_supply("BTC"), dec(12));
        assert_eq!(audit.expected_supply("ETH"), Decimal::ZERO);
        audit.verify("BTC", dec(12)).unwrap();
    }

    #[test]
    fn mismatch_is_reported() {
        let mut audit = SupplyAudit::new();
        audit.record_deposit("USDT", dec(100));
        let err = audit.verify("USDT", dec(101)).unwrap_err();
        assert!(matches!(err, HookmatchError::SupplyInvariantViolation { .. }));
        assert!(format!("{err}").contains("USDT"));
    }

    #[test]
    fn tracked_assets_sorted_and_unique() {
        let mut audit = SupplyAudit::new();
        audit.record_deposit("USDT", dec(1));
        audit.record_deposit("BTC", dec(1));
        audit.record_withdrawal("BTC", dec(1));
        assert_eq!(audit.tracked_assets(), vec!["BTC".to_string(), "USDT".to_string()]);
    }
}
