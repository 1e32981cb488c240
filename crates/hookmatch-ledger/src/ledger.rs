//! Committed balance state.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use hookmatch_codec::PackedBalance;
use hookmatch_types::{Asset, BalanceEntry, Result, UserId};
use rust_decimal::Decimal;

use crate::{LedgerTxn, SharedLedger, SupplyAudit};

/// In-memory ledger of every (trader, asset) balance.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    /// `(UserId, Asset) -> packed {available, locked}`
    balances: HashMap<(UserId, Asset), PackedBalance>,
    /// Trader -> assets with a non-zero locked balance.
    locked_index: HashMap<UserId, BTreeSet<Asset>>,
    supply: SupplyAudit,
}

impl BalanceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the ledger for sharing between books.
    #[must_use]
    pub fn shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Start staging mutations. Nothing is visible until
    /// [`LedgerTxn::commit`]; dropping the txn discards it.
    pub fn begin(&mut self) -> LedgerTxn<'_> {
        LedgerTxn::new(self)
    }

    /// Balance of `user` in `asset`; zero if never touched.
    #[must_use]
    pub fn balance(&self, user: &UserId, asset: &str) -> BalanceEntry {
        self.balances
            .get(&(*user, asset.to_string()))
            .map(decode)
            .unwrap_or_default()
    }

    // =================================================================
    // Single-operation entry points
    // =================================================================

    /// Credit `amount` to available.
    ///
    /// # Errors
    /// `InvalidAmount` if not positive, `FieldOverflow` if the balance
    /// would no longer fit its record.
    pub fn deposit(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.begin();
        txn.deposit(user, asset, amount)?;
        txn.commit();
        Ok(())
    }

    /// Debit `amount` from available.
    ///
    /// # Errors
    /// `InvalidAmount` if not positive, `InsufficientBalance` if not enough
    /// is available.
    pub fn withdraw(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.begin();
        txn.withdraw(user, asset, amount)?;
        txn.commit();
        Ok(())
    }

    /// Move `amount` from available to locked. Zero is a no-op.
    ///
    /// # Errors
    /// `InsufficientBalance` if available < amount, `InvalidAmount` if
    /// negative.
    pub fn lock(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.begin();
        txn.lock(user, asset, amount)?;
        txn.commit();
        Ok(())
    }

    /// Move `amount` from locked back to available. Zero is a no-op.
    ///
    /// # Errors
    /// `InsufficientLocked` if locked < amount, `InvalidAmount` if negative.
    pub fn unlock(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.begin();
        txn.unlock(user, asset, amount)?;
        txn.commit();
        Ok(())
    }

    /// Pay `amount` out of `from`'s locked balance into `to`'s available
    /// balance. Zero is a no-op.
    ///
    /// # Errors
    /// `InsufficientLocked` if `from` has less than `amount` locked.
    pub fn settle(&mut self, from: &UserId, to: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        let mut txn = self.begin();
        txn.settle(from, to, asset, amount)?;
        txn.commit();
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Assets in which `user` currently has funds locked, sorted.
    #[must_use]
    pub fn locked_assets(&self, user: &UserId) -> Vec<Asset> {
        self.locked_index
            .get(user)
            .map(|assets| assets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every balance `user` holds.
    #[must_use]
    pub fn user_balances(&self, user: &UserId) -> HashMap<Asset, BalanceEntry> {
        self.balances
            .iter()
            .filter(|((uid, _), _)| uid == user)
            .map(|((_, asset), record)| (asset.clone(), decode(record)))
            .collect()
    }

    /// Sum of available + locked over all traders.
    #[must_use]
    pub fn total_supply(&self, asset: &str) -> Decimal {
        self.entries_for(asset).map(|e| e.total()).sum()
    }

    /// Sum of locked balances over all traders.
    #[must_use]
    pub fn total_locked(&self, asset: &str) -> Decimal {
        self.entries_for(asset).map(|e| e.locked).sum()
    }

    /// Check that `asset`'s supply matches its custody flows.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` on mismatch.
    pub fn verify_supply(&self, asset: &str) -> Result<()> {
        let result = self.supply.verify(asset, self.total_supply(asset));
        if let Err(err) = &result {
            tracing::warn!(asset, error = %err, "supply audit failed");
        }
        result
    }

    /// [`Self::verify_supply`] for every asset that has seen a deposit or
    /// withdrawal.
    pub fn verify_all(&self) -> Result<()> {
        self.supply
            .tracked_assets()
            .iter()
            .try_for_each(|asset| self.verify_supply(asset))
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyAudit {
        &self.supply
    }

    /// Number of non-zero balance records.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.balances.len()
    }

    // =================================================================
    // Commit path
    // =================================================================

    pub(crate) fn write(&mut self, user: UserId, asset: Asset, record: PackedBalance) {
        let has_locked = record.locked().is_ok_and(|l| !l.is_zero());
        if has_locked {
            self.locked_index
                .entry(user)
                .or_default()
                .insert(asset.clone());
        } else if let Some(assets) = self.locked_index.get_mut(&user) {
            assets.remove(&asset);
            if assets.is_empty() {
                self.locked_index.remove(&user);
            }
        }

        if record.is_zero() {
            self.balances.remove(&(user, asset));
        } else {
            self.balances.insert((user, asset), record);
        }
    }

    pub(crate) fn supply_mut(&mut self) -> &mut SupplyAudit {
        &mut self.supply
    }

    fn entries_for<'a>(&'a self, asset: &'a str) -> impl Iterator<Item = BalanceEntry> + 'a {
        self.balances
            .iter()
            .filter(move |((_, a), _)| a == asset)
            .map(|(_, record)| decode(record))
    }
}

// Records only ever hold 96-bit fields written from valid decimals, and
// those always decode.
fn decode(record: &PackedBalance) -> BalanceEntry {
    record.decode().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use hookmatch_types::HookmatchError;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn deposit_and_query() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();

        ledger.deposit(&user, "USDT", dec(1000)).unwrap();
        let bal = ledger.balance(&user, "USDT");
        assert_eq!(bal.available, dec(1000));
        assert_eq!(bal.locked, Decimal::ZERO);
        assert_eq!(ledger.total_supply("USDT"), dec(1000));
    }

    #[test]
    fn deposit_non_positive_fails() {
        let mut ledger = BalanceLedger::new();
        assert!(ledger.deposit(&UserId::new(), "BTC", Decimal::ZERO).is_err());
        assert!(ledger.deposit(&UserId::new(), "BTC", dec(-1)).is_err());
        assert_eq!(ledger.entry_count(), 0);
    }

    #[test]
    fn withdraw_insufficient() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "USDT", dec(100)).unwrap();
        assert!(matches!(
            ledger.withdraw(&user, "USDT", dec(200)),
            Err(HookmatchError::InsufficientBalance { .. })
        ));
        ledger.withdraw(&user, "USDT", dec(30)).unwrap();
        assert_eq!(ledger.balance(&user, "USDT").available, dec(70));
        ledger.verify_supply("USDT").unwrap();
    }

    #[test]
    fn lock_and_unlock() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "USDT", dec(1000)).unwrap();

        ledger.lock(&user, "USDT", dec(400)).unwrap();
        let bal = ledger.balance(&user, "USDT");
        assert_eq!(bal.available, dec(600));
        assert_eq!(bal.locked, dec(400));
        assert_eq!(ledger.locked_assets(&user), vec!["USDT".to_string()]);

        ledger.unlock(&user, "USDT", dec(400)).unwrap();
        assert_eq!(ledger.balance(&user, "USDT").available, dec(1000));
        assert!(ledger.locked_assets(&user).is_empty());
    }

    #[test]
    fn lock_insufficient_leaves_state() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "USDT", dec(100)).unwrap();
        assert!(matches!(
            ledger.lock(&user, "USDT", dec(200)),
            Err(HookmatchError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance(&user, "USDT").available, dec(100));
        assert_eq!(ledger.balance(&user, "USDT").locked, Decimal::ZERO);
    }

    #[test]
    fn unlock_insufficient() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "USDT", dec(100)).unwrap();
        ledger.lock(&user, "USDT", dec(50)).unwrap();
        assert!(matches!(
            ledger.unlock(&user, "USDT", dec(100)),
            Err(HookmatchError::InsufficientLocked { .. })
        ));
    }

    #[test]
    fn zero_amounts_are_noops_negative_rejected() {
        let mut ledger = BalanceLedger::new();
        let a = UserId::new();
        let b = UserId::new();
        ledger.lock(&a, "BTC", Decimal::ZERO).unwrap();
        ledger.unlock(&a, "BTC", Decimal::ZERO).unwrap();
        ledger.settle(&a, &b, "BTC", Decimal::ZERO).unwrap();
        assert_eq!(ledger.entry_count(), 0);

        assert!(matches!(
            ledger.lock(&a, "BTC", dec(-1)),
            Err(HookmatchError::InvalidAmount { .. })
        ));
        assert!(matches!(
            ledger.settle(&a, &b, "BTC", dec(-1)),
            Err(HookmatchError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn settle_moves_locked_to_counterparty() {
        let mut ledger = BalanceLedger::new();
        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(&seller, "BTC", dec(2)).unwrap();
        ledger.lock(&seller, "BTC", dec(2)).unwrap();

        ledger.settle(&seller, &buyer, "BTC", dec(1)).unwrap();
        assert_eq!(ledger.balance(&seller, "BTC").locked, dec(1));
        assert_eq!(ledger.balance(&buyer, "BTC").available, dec(1));
        assert_eq!(ledger.total_locked("BTC"), dec(1));
        ledger.verify_all().unwrap();

        assert!(matches!(
            ledger.settle(&seller, &buyer, "BTC", dec(5)),
            Err(HookmatchError::InsufficientLocked { .. })
        ));
    }

    #[test]
    fn settle_to_self() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "BTC", dec(3)).unwrap();
        ledger.lock(&user, "BTC", dec(3)).unwrap();
        ledger.settle(&user, &user, "BTC", dec(3)).unwrap();
        let bal = ledger.balance(&user, "BTC");
        assert_eq!(bal.available, dec(3));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn user_balances_query() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        ledger.deposit(&user, "BTC", dec(5)).unwrap();
        ledger.deposit(&user, "USDT", dec(10000)).unwrap();
        ledger.deposit(&UserId::new(), "BTC", dec(1)).unwrap();

        let balances = ledger.user_balances(&user);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["BTC"].available, dec(5));
        assert_eq!(balances["USDT"].available, dec(10000));
    }

    #[test]
    fn overflowing_credit_fails() {
        let mut ledger = BalanceLedger::new();
        let user = UserId::new();
        let huge = hookmatch_codec::from_fixed("x", (1u128 << 96) - 1, 8).unwrap();
        ledger.deposit(&user, "BTC", huge).unwrap();
        assert!(matches!(
            ledger.deposit(&user, "BTC", dec(1)),
            Err(HookmatchError::FieldOverflow { .. })
        ));
        assert_eq!(ledger.balance(&user, "BTC").available, huge);
        ledger.verify_supply("BTC").unwrap();
    }

    #[test]
    fn nonexistent_user_returns_zero() {
        let ledger = BalanceLedger::new();
        assert!(ledger.balance(&UserId::new(), "BTC").is_zero());
    }
}
