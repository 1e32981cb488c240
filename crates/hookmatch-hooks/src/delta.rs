//! Values exchanged between a book and its hook.

use hookmatch_types::{FeeQuote, MarketPair, Order};
use rust_decimal::Decimal;

/// Opaque caller-supplied bytes forwarded untouched to every call-point of
/// one book operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookPayload(pub Vec<u8>);

impl HookPayload {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HookPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for HookPayload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Signed adjustment to an incoming order. Zero means "no change".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderDelta {
    pub price_adjustment: Decimal,
    pub amount_adjustment: Decimal,
}

impl OrderDelta {
    pub const NONE: Self = Self {
        price_adjustment: Decimal::ZERO,
        amount_adjustment: Decimal::ZERO,
    };

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.price_adjustment.is_zero() && self.amount_adjustment.is_zero()
    }
}

/// Adjustment to a single cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchDelta {
    /// Fee split to charge for this cross. `None` charges nothing.
    pub fee_override: Option<FeeQuote>,
    /// Signed shift of the execution price away from the maker's price.
    pub price_adjustment: Decimal,
}

impl MatchDelta {
    pub const NONE: Self = Self {
        fee_override: None,
        price_adjustment: Decimal::ZERO,
    };

    /// Delta that only sets fees.
    #[must_use]
    pub fn with_fees(fees: FeeQuote) -> Self {
        Self {
            fee_override: Some(fees),
            price_adjustment: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.fee_override.is_none() && self.price_adjustment.is_zero()
    }
}

/// A cross as the dispatcher approved it: the execution price with any
/// adjustment applied, and the fees to charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTerms {
    pub price: Decimal,
    pub fees: FeeQuote,
}

impl MatchTerms {
    /// Maker's price, no fees.
    #[must_use]
    pub fn at(price: Decimal) -> Self {
        Self {
            price,
            fees: FeeQuote::ZERO,
        }
    }
}

/// Answer to `before_cancel_order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelVerdict {
    #[default]
    Allow,
    Veto,
}

/// Everything a hook sees about a pending cross.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub market: &'a MarketPair,
    /// The incoming order, with fills so far applied.
    pub taker: &'a Order,
    /// The resting order being crossed.
    pub maker: &'a Order,
    /// Execution price before adjustment (the maker's price).
    pub price: Decimal,
    /// Base amount of this cross.
    pub amount: Decimal,
    /// Normalized quote value at `price`.
    pub trade_value: Decimal,
}
