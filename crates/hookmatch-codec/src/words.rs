//! Raw word storage with masked field access.

use hookmatch_types::{HookmatchError, Result};

use crate::BitField;

/// `N` 128-bit words holding a packed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedWords<const N: usize>([u128; N]);

impl<const N: usize> PackedWords<N> {
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; N])
    }

    #[must_use]
    pub const fn from_words(words: [u128; N]) -> Self {
        Self(words)
    }

    #[must_use]
    pub const fn words(&self) -> &[u128; N] {
        &self.0
    }

    /// Read `field`. A field outside the record reads as zero.
    #[must_use]
    pub fn get(&self, field: &BitField) -> u128 {
        self.0
            .get(field.word)
            .map_or(0, |w| (w >> field.offset) & field.max_value())
    }

    /// Overwrite exactly `field`'s bits with `value`.
    ///
    /// # Errors
    /// - `FieldOverflow` if `value` does not fit the field width
    /// - `InvalidLayout` if the field lies outside the record
    pub fn set(&mut self, field: &BitField, value: u128) -> Result<()> {
        if value > field.max_value() {
            return Err(HookmatchError::FieldOverflow {
                field: field.name,
                width: field.width,
                value: value.to_string(),
            });
        }
        let word = self
            .0
            .get_mut(field.word)
            .ok_or_else(|| HookmatchError::InvalidLayout {
                reason: format!("field {} is in word {} of {N}", field.name, field.word),
            })?;
        *word = (*word & !field.mask()) | (value << field.offset);
        Ok(())
    }
}

impl<const N: usize> Default for PackedWords<N> {
    fn default() -> Self {
        Self::zeroed()
    }
}
