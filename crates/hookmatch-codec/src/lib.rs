//! # hookmatch-codec
//!
//! **Fixed-width bit-packed records for HookMatch.**
//!
//! Orders and balances are stored as arrays of 128-bit words. Each value
//! occupies a declared bit range inside one word; reads and writes go
//! through [`BitField`] accessors that check widths, so an out-of-range
//! value fails instead of corrupting a neighbouring field.
//!
//! - [`layout`]: field descriptors and layout validation
//! - [`words`]: the raw word array with masked get/set
//! - [`fixed`]: decimal to fixed-point conversion
//! - [`order_record`]: the 4-word packed order
//! - [`balance_record`]: the 2-word packed balance

pub mod balance_record;
pub mod fixed;
pub mod layout;
pub mod order_record;
pub mod words;

pub use balance_record::PackedBalance;
pub use fixed::{from_fixed, to_fixed};
pub use layout::{BitField, WORD_BITS, min_words, validate_layout};
pub use order_record::{OrderFields, PackedOrder};
pub use words::PackedWords;
