//! Per-trader, per-asset custody state.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Asset symbol, e.g. `"BTC"` or `"USDT"`.
pub type Asset = String;

/// Funds one trader holds in one asset.
///
/// `locked` is whatever live orders have reserved; everything else is
/// `available` for new orders and withdrawal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    pub available: Decimal,
    pub locked: Decimal,
}

impl BalanceEntry {
    pub const ZERO: Self = Self {
        available: Decimal::ZERO,
        locked: Decimal::ZERO,
    };

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }

    #[must_use]
    pub fn has_locked(&self) -> bool {
        !self.locked.is_zero()
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.locked.is_zero()
    }
}

impl fmt::Display for BalanceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} available / {} locked", self.available, self.locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_balance_is_zero() {
        assert_eq!(BalanceEntry::default(), BalanceEntry::ZERO);
        assert!(BalanceEntry::ZERO.is_zero());
        assert!(!BalanceEntry::ZERO.has_locked());
    }

    #[test]
    fn locked_funds_count_toward_total() {
        let entry = BalanceEntry {
            available: Decimal::new(75, 1),
            locked: Decimal::new(25, 1),
        };
        assert_eq!(entry.total(), Decimal::new(10, 0));
        assert!(entry.has_locked());
        assert_eq!(entry.to_string(), "7.5 available / 2.5 locked");
    }

    #[test]
    fn decimals_serialize_as_strings() {
        let entry = BalanceEntry {
            available: Decimal::new(12_345, 2),
            locked: Decimal::ZERO,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"available":"123.45","locked":"0"}"#);
        assert_eq!(serde_json::from_str::<BalanceEntry>(&json).unwrap(), entry);
    }
}
