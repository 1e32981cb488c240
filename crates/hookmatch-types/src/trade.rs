//! Trade records produced by the matching engine.
//!
//! A [`Trade`] is the immutable record of one cross between an incoming
//! (taker) order and a resting (maker) order, executed at the maker's price
//! unless the book's hook moved it within the crossing band.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{HookmatchError, MarketPair, OrderId, OrderSide, Result, TradeId, UserId, constants};

/// Fee split for a single trade, denominated in the quote asset.
///
/// `taker_fee` is charged to the taker; of it, `maker_rebate` is paid to the
/// maker and `pool_retained` goes to the book's fee collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeQuote {
    pub taker_fee: Decimal,
    pub maker_rebate: Decimal,
    pub pool_retained: Decimal,
}

impl FeeQuote {
    pub const ZERO: Self = Self {
        taker_fee: Decimal::ZERO,
        maker_rebate: Decimal::ZERO,
        pool_retained: Decimal::ZERO,
    };

    /// No component is negative and the split adds up.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.taker_fee >= Decimal::ZERO
            && self.maker_rebate >= Decimal::ZERO
            && self.pool_retained >= Decimal::ZERO
            && self.maker_rebate.checked_add(self.pool_retained) == Some(self.taker_fee)
    }
}

/// Quote value of `amount` at `price`, rounded toward zero to
/// [`constants::QUOTE_PRECISION`] places.
///
/// # Errors
/// `InvalidAmount` if the product does not fit a `Decimal`.
pub fn quote_value(price: Decimal, amount: Decimal) -> Result<Decimal> {
    price
        .checked_mul(amount)
        .map(|v| v.round_dp_with_strategy(constants::QUOTE_PRECISION, RoundingStrategy::ToZero))
        .ok_or_else(|| HookmatchError::InvalidAmount {
            reason: format!("quote value of {amount} at {price} overflows"),
        })
}

/// A single executed cross.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Deterministic id derived from market + fill sequence.
    pub id: TradeId,
    pub market: MarketPair,
    /// Per-book fill counter, starting at 0.
    pub fill_sequence: u64,
    pub taker_order_id: OrderId,
    pub taker: UserId,
    pub maker_order_id: OrderId,
    pub maker: UserId,
    /// Which side the taker was on.
    pub taker_side: OrderSide,
    /// Execution price.
    pub price: Decimal,
    /// Executed amount in base asset.
    pub amount: Decimal,
    /// `price * amount`, normalized.
    pub quote_amount: Decimal,
    pub fees: FeeQuote,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[must_use]
    pub fn taker_is_buyer(&self) -> bool {
        self.taker_side == OrderSide::Buy
    }

    /// `(buyer, seller)` for this trade.
    #[must_use]
    pub fn buyer_seller(&self) -> (UserId, UserId) {
        if self.taker_is_buyer() {
            (self.taker, self.maker)
        } else {
            (self.maker, self.taker)
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} {} @ {} = {}",
            self.id, self.market, self.taker_side, self.amount, self.price, self.quote_amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_trade() -> Trade {
        let market = MarketPair::new("BTC", "USDT");
        Trade {
            id: TradeId::deterministic(&market, 0),
            market,
            fill_sequence: 0,
            taker_order_id: OrderId(2),
            taker: UserId::new(),
            maker_order_id: OrderId(1),
            maker: UserId::new(),
            taker_side: OrderSide::Sell,
            price: Decimal::new(50000, 0),
            amount: Decimal::ONE,
            quote_amount: Decimal::new(50000, 0),
            fees: FeeQuote::ZERO,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn buyer_seller_follows_taker_side() {
        let t = make_trade();
        assert!(!t.taker_is_buyer());
        assert_eq!(t.buyer_seller(), (t.maker, t.taker));
    }

    #[test]
    fn quote_value_truncates() {
        let v = quote_value(Decimal::new(3, 0), Decimal::new(3_333_333_333, 10)).unwrap();
        assert_eq!(v, Decimal::new(99_999_999, 8));
        assert_eq!(
            quote_value(Decimal::new(100, 0), Decimal::new(5, 0)).unwrap(),
            Decimal::new(500, 0)
        );
    }

    #[test]
    fn quote_value_overflow_is_an_error() {
        let err = quote_value(Decimal::MAX, Decimal::new(2, 0)).unwrap_err();
        assert!(matches!(err, HookmatchError::InvalidAmount { .. }));
        assert!(format!("{err}").contains("overflows"));
    }

    #[test]
    fn fee_quote_consistency() {
        assert!(FeeQuote::ZERO.is_consistent());
        let good = FeeQuote {
            taker_fee: Decimal::new(2, 0),
            maker_rebate: Decimal::new(5, 1),
            pool_retained: Decimal::new(15, 1),
        };
        assert!(good.is_consistent());
        let bad = FeeQuote {
            pool_retained: Decimal::ONE,
            ..good
        };
        assert!(!bad.is_consistent());

        let huge = FeeQuote {
            taker_fee: Decimal::ONE,
            maker_rebate: Decimal::MAX,
            pool_retained: Decimal::MAX,
        };
        assert!(!huge.is_consistent());
    }

    #[test]
    fn trade_display() {
        let s = format!("{}", make_trade());
        assert!(s.contains("BTC/USDT"));
        assert!(s.contains("50000"));
    }

    #[test]
    fn trade_serde_roundtrip() {
        let trade = make_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
