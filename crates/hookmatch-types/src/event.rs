//! Domain events emitted by a book.
//!
//! Every committed operation appends its events to the book's log in the
//! order they happened. Aborted operations append nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MarketPair, OrderId, OrderSide, OrderStatus, OrderType, Trade, UserId};

/// Why an order left the book (or never reached it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalReason {
    Filled,
    Cancelled,
    /// A market order's unfilled remainder was discarded.
    PartialMarketFill,
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::PartialMarketFill => write!(f, "PARTIAL_MARKET_FILL"),
        }
    }
}

/// A single state change observed on a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookEvent {
    /// An order was accepted, after any `before_place_order` adjustment.
    OrderPlaced {
        order_id: OrderId,
        trader: UserId,
        side: OrderSide,
        order_type: OrderType,
        price: Decimal,
        amount: Decimal,
    },
    /// The unfilled remainder of a limit order now rests on the book.
    OrderAddedToBook {
        order_id: OrderId,
        side: OrderSide,
        price: Decimal,
        remaining: Decimal,
    },
    OrderRemovedFromBook {
        order_id: OrderId,
        reason: RemovalReason,
    },
    OrderStatusChanged {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
    MatchExecuted { trade: Trade },
}

impl BookEvent {
    /// The order this event is primarily about (the taker for matches).
    #[must_use]
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::OrderPlaced { order_id, .. }
            | Self::OrderAddedToBook { order_id, .. }
            | Self::OrderRemovedFromBook { order_id, .. }
            | Self::OrderStatusChanged { order_id, .. } => *order_id,
            Self::MatchExecuted { trade } => trade.taker_order_id,
        }
    }
}

/// An event stamped with its position in the book's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Strictly increasing per book, starting at 0.
    pub sequence: u64,
    pub market: MarketPair,
    pub event: BookEvent,
}
