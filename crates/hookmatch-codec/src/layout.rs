//! Bit field descriptors and layout validation.

use hookmatch_types::{HookmatchError, Result};

/// Width of one storage word.
pub const WORD_BITS: u32 = 128;

/// A named bit range inside one word of a packed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub name: &'static str,
    /// Index of the word holding the field.
    pub word: usize,
    /// Lowest bit of the field within its word.
    pub offset: u32,
    pub width: u32,
}

impl BitField {
    #[must_use]
    pub const fn new(name: &'static str, word: usize, offset: u32, width: u32) -> Self {
        Self {
            name,
            word,
            offset,
            width,
        }
    }

    /// Largest value the field can hold.
    #[must_use]
    pub const fn max_value(&self) -> u128 {
        if self.width >= WORD_BITS {
            u128::MAX
        } else {
            (1u128 << self.width) - 1
        }
    }

    /// The field's bit range in place within its word.
    #[must_use]
    pub const fn mask(&self) -> u128 {
        self.max_value() << self.offset
    }

    /// One past the highest bit the field occupies.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset + self.width
    }
}

/// Fewest 128-bit words that can hold `total_bits`.
#[must_use]
pub fn min_words(total_bits: u32) -> usize {
    total_bits.div_ceil(WORD_BITS) as usize
}

/// Check that `fields` form a sound record of `words` words.
///
/// Fields must be non-empty, stay inside their word, not overlap each
/// other, and the record must not use more words than its total width
/// requires.
pub fn validate_layout(fields: &[BitField], words: usize) -> Result<()> {
    let mut total_bits = 0u32;
    for (i, field) in fields.iter().enumerate() {
        if field.width == 0 || field.width > WORD_BITS {
            return Err(invalid(format!(
                "field {} has width {}",
                field.name, field.width
            )));
        }
        if field.end() > WORD_BITS {
            return Err(invalid(format!(
                "field {} straddles word {} (bits {}..{})",
                field.name,
                field.word,
                field.offset,
                field.end()
            )));
        }
        if field.word >= words {
            return Err(invalid(format!(
                "field {} is in word {} of a {words}-word record",
                field.name, field.word
            )));
        }
        for other in &fields[..i] {
            if other.word == field.word && other.mask() & field.mask() != 0 {
                return Err(invalid(format!(
                    "fields {} and {} overlap",
                    other.name, field.name
                )));
            }
        }
        total_bits += field.width;
    }

    let needed = min_words(total_bits);
    if words != needed {
        return Err(invalid(format!(
            "{total_bits} bits need {needed} words, layout uses {words}"
        )));
    }
    Ok(())
}

fn invalid(reason: String) -> HookmatchError {
    HookmatchError::InvalidLayout { reason }
}
