//! Inputs and outputs of book operations.

use hookmatch_types::{Order, OrderId, OrderSide, OrderType, Trade, UserId};
use rust_decimal::Decimal;

/// A placement as submitted by a trader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub trader: UserId,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Limit price. Must be `None` for market orders.
    pub price: Option<Decimal>,
    pub amount: Decimal,
}

impl OrderRequest {
    #[must_use]
    pub fn limit(trader: UserId, side: OrderSide, price: Decimal, amount: Decimal) -> Self {
        Self {
            trader,
            side,
            order_type: OrderType::Limit,
            price: Some(price),
            amount,
        }
    }

    #[must_use]
    pub fn market(trader: UserId, side: OrderSide, amount: Decimal) -> Self {
        Self {
            trader,
            side,
            order_type: OrderType::Market,
            price: None,
            amount,
        }
    }
}

/// Result of a committed placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOutcome {
    /// Final state of the placed order.
    pub order: Order,
    /// Crosses executed, in fill order.
    pub trades: Vec<Trade>,
}

impl PlaceOutcome {
    #[must_use]
    pub fn order_id(&self) -> OrderId {
        self.order.id
    }

    /// Base amount filled by this placement.
    #[must_use]
    pub fn filled(&self) -> Decimal {
        self.trades.iter().map(|t| t.amount).sum()
    }
}

/// Aggregated amount at one price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthLevel {
    pub price: Decimal,
    pub amount: Decimal,
    pub order_count: usize,
}

/// Top-of-book snapshot, best levels first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDepth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}
