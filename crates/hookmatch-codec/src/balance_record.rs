//! Packed balance record: one 96-bit amount per word.

use hookmatch_types::{BalanceEntry, Result, constants};
use rust_decimal::Decimal;

use crate::{BitField, PackedWords, from_fixed, to_fixed};

pub const AVAILABLE: BitField = BitField::new("available", 0, 0, 96);
pub const LOCKED: BitField = BitField::new("locked", 1, 0, 96);

pub const BALANCE_LAYOUT: [BitField; 2] = [AVAILABLE, LOCKED];
pub const BALANCE_WORDS: usize = 2;

/// A 2-word packed `(available, locked)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedBalance {
    words: PackedWords<BALANCE_WORDS>,
}

impl PackedBalance {
    pub fn encode(entry: &BalanceEntry) -> Result<Self> {
        let mut record = Self::default();
        record.update_available(entry.available)?;
        record.update_locked(entry.locked)?;
        Ok(record)
    }

    pub fn decode(&self) -> Result<BalanceEntry> {
        Ok(BalanceEntry {
            available: self.available()?,
            locked: self.locked()?,
        })
    }

    pub fn available(&self) -> Result<Decimal> {
        from_fixed(AVAILABLE.name, self.words.get(&AVAILABLE), constants::QTY_PRECISION)
    }

    pub fn locked(&self) -> Result<Decimal> {
        from_fixed(LOCKED.name, self.words.get(&LOCKED), constants::QTY_PRECISION)
    }

    /// Overwrite the available amount. On error the record is unchanged.
    pub fn update_available(&mut self, value: Decimal) -> Result<()> {
        let raw = to_fixed(AVAILABLE.name, value, constants::QTY_PRECISION, AVAILABLE.width)?;
        self.words.set(&AVAILABLE, raw)
    }

    /// Overwrite the locked amount. On error the record is unchanged.
    pub fn update_locked(&mut self, value: Decimal) -> Result<()> {
        let raw = to_fixed(LOCKED.name, value, constants::QTY_PRECISION, LOCKED.width)?;
        self.words.set(&LOCKED, raw)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.words.words().iter().all(|w| *w == 0)
    }
}
