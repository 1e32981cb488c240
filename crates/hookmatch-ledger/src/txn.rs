//! Staged ledger mutations.
//!
//! A [`LedgerTxn`] holds a write-set over the committed ledger. Reads see
//! staged writes first and fall through to committed state. `commit`
//! applies the whole write-set at once; dropping the txn discards it.

use std::collections::HashMap;

use hookmatch_codec::PackedBalance;
use hookmatch_types::{Asset, BalanceEntry, HookmatchError, Result, UserId};
use rust_decimal::Decimal;

use crate::BalanceLedger;

pub struct LedgerTxn<'a> {
    ledger: &'a mut BalanceLedger,
    writes: HashMap<(UserId, Asset), PackedBalance>,
    deposits: Vec<(Asset, Decimal)>,
    withdrawals: Vec<(Asset, Decimal)>,
}

impl<'a> LedgerTxn<'a> {
    pub(crate) fn new(ledger: &'a mut BalanceLedger) -> Self {
        Self {
            ledger,
            writes: HashMap::new(),
            deposits: Vec::new(),
            withdrawals: Vec::new(),
        }
    }

    /// Balance as it would be after commit.
    #[must_use]
    pub fn balance(&self, user: &UserId, asset: &str) -> BalanceEntry {
        self.writes
            .get(&(*user, asset.to_string()))
            .map_or_else(
                || self.ledger.balance(user, asset),
                |record| record.decode().unwrap_or_default(),
            )
    }

    /// Whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deposits.is_empty() && self.withdrawals.is_empty()
    }

    /// Number of balance records touched.
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.writes.len()
    }

    pub fn deposit(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        require_positive("deposit", amount)?;
        let mut entry = self.balance(user, asset);
        entry.available = checked_credit(asset, entry.available, amount)?;
        self.stage(user, asset, &entry)?;
        self.deposits.push((asset.to_string(), amount));
        Ok(())
    }

    pub fn withdraw(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        require_positive("withdraw", amount)?;
        let mut entry = self.balance(user, asset);
        if entry.available < amount {
            return Err(HookmatchError::InsufficientBalance {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        self.stage(user, asset, &entry)?;
        self.withdrawals.push((asset.to_string(), amount));
        Ok(())
    }

    pub fn lock(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        if !non_negative("lock", amount)? {
            return Ok(());
        }
        let mut entry = self.balance(user, asset);
        if entry.available < amount {
            return Err(HookmatchError::InsufficientBalance {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        entry.locked = checked_credit(asset, entry.locked, amount)?;
        self.stage(user, asset, &entry)
    }

    pub fn unlock(&mut self, user: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        if !non_negative("unlock", amount)? {
            return Ok(());
        }
        let mut entry = self.balance(user, asset);
        if entry.locked < amount {
            return Err(HookmatchError::InsufficientLocked {
                needed: amount,
                locked: entry.locked,
            });
        }
        entry.locked -= amount;
        entry.available = checked_credit(asset, entry.available, amount)?;
        self.stage(user, asset, &entry)
    }

    pub fn settle(&mut self, from: &UserId, to: &UserId, asset: &str, amount: Decimal) -> Result<()> {
        if !non_negative("settle", amount)? {
            return Ok(());
        }
        let mut payer = self.balance(from, asset);
        if payer.locked < amount {
            return Err(HookmatchError::InsufficientLocked {
                needed: amount,
                locked: payer.locked,
            });
        }
        payer.locked -= amount;
        self.stage(from, asset, &payer)?;

        // Read after staging the debit so a self-settlement sees it.
        let mut payee = self.balance(to, asset);
        payee.available = checked_credit(asset, payee.available, amount)?;
        self.stage(to, asset, &payee)
    }

    /// Apply every staged write and custody flow.
    pub fn commit(self) {
        let Self {
            ledger,
            writes,
            deposits,
            withdrawals,
        } = self;
        let touched = writes.len();
        for ((user, asset), record) in writes {
            ledger.write(user, asset, record);
        }
        let supply = ledger.supply_mut();
        for (asset, amount) in deposits {
            supply.record_deposit(&asset, amount);
        }
        for (asset, amount) in withdrawals {
            supply.record_withdrawal(&asset, amount);
        }
        tracing::trace!(touched, "ledger txn committed");
    }

    fn stage(&mut self, user: &UserId, asset: &str, entry: &BalanceEntry) -> Result<()> {
        let record = PackedBalance::encode(entry)?;
        self.writes.insert((*user, asset.to_string()), record);
        Ok(())
    }
}

fn require_positive(op: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(HookmatchError::InvalidAmount {
            reason: format!("{op} amount must be positive, got {amount}"),
        });
    }
    Ok(())
}

/// `Ok(false)` for zero (nothing to do), error for negative.
fn non_negative(op: &str, amount: Decimal) -> Result<bool> {
    if amount < Decimal::ZERO {
        return Err(HookmatchError::InvalidAmount {
            reason: format!("{op} amount must not be negative, got {amount}"),
        });
    }
    Ok(!amount.is_zero())
}

fn checked_credit(asset: &str, balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .ok_or_else(|| HookmatchError::FieldOverflow {
            field: "balance",
            width: 96,
            value: format!("{balance} + {amount} {asset}"),
        })
}
