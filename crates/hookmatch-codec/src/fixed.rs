//! Decimal <-> fixed-point conversion.
//!
//! A decimal `v` is stored as the integer `v * 10^scale`. Conversion is
//! exact or fails: nothing is silently rounded or truncated.

use hookmatch_types::{HookmatchError, Result};
use rust_decimal::Decimal;

/// Encode `value` as a fixed-point integer with `scale` fractional digits
/// that fits in `width` bits.
///
/// # Errors
/// - `FieldOverflow` if `value` is negative or too large for `width`
/// - `PrecisionLoss` if `value` has more than `scale` fractional digits
pub fn to_fixed(field: &'static str, value: Decimal, scale: u32, width: u32) -> Result<u128> {
    let overflow = || HookmatchError::FieldOverflow {
        field,
        width,
        value: value.to_string(),
    };
    if value.is_sign_negative() && !value.is_zero() {
        return Err(overflow());
    }

    let normalized = value.normalize();
    if normalized.scale() > scale {
        return Err(HookmatchError::PrecisionLoss {
            field,
            value: value.to_string(),
        });
    }

    let mantissa = u128::try_from(normalized.mantissa()).map_err(|_| overflow())?;
    let raw = 10u128
        .checked_pow(scale - normalized.scale())
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(overflow)?;

    let limit = if width >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    if raw > limit {
        return Err(overflow());
    }
    Ok(raw)
}

/// Decode a fixed-point integer with `scale` fractional digits.
///
/// # Errors
/// `CorruptRecord` if `raw` is beyond what a decimal can represent.
pub fn from_fixed(field: &'static str, raw: u128, scale: u32) -> Result<Decimal> {
    let corrupt = |reason: String| HookmatchError::CorruptRecord { field, reason };
    let signed = i128::try_from(raw).map_err(|e| corrupt(e.to_string()))?;
    Decimal::try_from_i128_with_scale(signed, scale)
        .map(|d| d.normalize())
        .map_err(|e| corrupt(e.to_string()))
}
