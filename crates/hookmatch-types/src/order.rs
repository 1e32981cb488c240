//! Order model for the HookMatch order book.
//!
//! Status moves strictly forward:
//!
//! ```text
//! Active ──▶ PartiallyFilled ──▶ Filled
//!    │              │
//!    └──────────────┴─────────▶ Cancelled
//! ```
//!
//! `Filled` and `Cancelled` are terminal; a terminal order is never mutated
//! again and its id is never reused.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{HookmatchError, MarketPair, OrderId, Result, UserId};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Limit => write!(f, "LIMIT"),
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Active,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// `Filled` and `Cancelled` never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal lifecycle step.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (
                Self::Active,
                Self::PartiallyFilled | Self::Filled | Self::Cancelled
            ) | (Self::PartiallyFilled, Self::PartiallyFilled | Self::Filled | Self::Cancelled)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Core order struct.
///
/// `price` is zero for market orders. `filled_amount` never exceeds
/// `original_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub trader: UserId,
    pub market: MarketPair,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Decimal,
    pub original_amount: Decimal,
    pub filled_amount: Decimal,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Amount still open.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.original_amount - self.filled_amount
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining().is_zero()
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    #[must_use]
    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    /// Whether this (incoming) order crosses a resting order at `resting_price`.
    ///
    /// Market orders cross any resting order.
    #[must_use]
    pub fn crosses(&self, resting_price: Decimal) -> bool {
        match (self.order_type, self.side) {
            (OrderType::Market, _) => true,
            (OrderType::Limit, OrderSide::Buy) => self.price >= resting_price,
            (OrderType::Limit, OrderSide::Sell) => self.price <= resting_price,
        }
    }

    /// Record a fill of `amount` and advance the status.
    ///
    /// # Errors
    /// - `InvalidStatusTransition` if the order is already terminal
    /// - `InvalidAmount` if `amount` is not positive or exceeds the remainder
    pub fn apply_fill(&mut self, amount: Decimal) -> Result<()> {
        if self.is_terminal() {
            return Err(HookmatchError::InvalidStatusTransition {
                order_id: self.id,
                from: self.status,
                to: OrderStatus::Filled,
            });
        }
        if amount <= Decimal::ZERO || amount > self.remaining() {
            return Err(HookmatchError::InvalidAmount {
                reason: format!(
                    "fill of {amount} on {} with remaining {}",
                    self.id,
                    self.remaining()
                ),
            });
        }
        self.filled_amount += amount;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(())
    }

    /// Move to `Cancelled`.
    ///
    /// # Errors
    /// Returns `InvalidStatusTransition` if the order is already terminal.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(HookmatchError::InvalidStatusTransition {
                order_id: self.id,
                from: self.status,
                to: OrderStatus::Cancelled,
            });
        }
        self.status = OrderStatus::Cancelled;
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    pub fn dummy_limit(id: u64, side: OrderSide, price: Decimal, amount: Decimal) -> Self {
        Self {
            id: OrderId(id),
            trader: UserId::new(),
            market: MarketPair::new("BTC", "USDT"),
            side,
            order_type: OrderType::Limit,
            price,
            original_amount: amount,
            filled_amount: Decimal::ZERO,
            status: OrderStatus::Active,
            placed_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_default(),
        }
    }

    pub fn dummy_market(id: u64, side: OrderSide, amount: Decimal) -> Self {
        Self {
            order_type: OrderType::Market,
            price: Decimal::ZERO,
            ..Self::dummy_limit(id, side, Decimal::ZERO, amount)
        }
    }
}
