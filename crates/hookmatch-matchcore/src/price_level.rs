//! A single price level in the order book.
//!
//! Orders at the same price are kept in FIFO order (time priority) using a
//! [`VecDeque`] of ids. Order state lives in the order store.

use std::collections::VecDeque;

use hookmatch_types::OrderId;
use rust_decimal::Decimal;

/// All resting orders at one price.
///
/// The front of the deque has the highest time priority and is filled
/// first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    /// Order ids in time-priority order (front = oldest).
    pub orders: VecDeque<OrderId>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            orders: VecDeque::new(),
        }
    }

    /// Add an order at the back (lowest time priority).
    pub fn push_back(&mut self, order_id: OrderId) {
        self.orders.push_back(order_id);
    }

    #[must_use]
    pub fn front(&self) -> Option<OrderId> {
        self.orders.front().copied()
    }

    /// Remove a specific order. Returns whether it was present.
    pub fn remove_order(&mut self, order_id: OrderId) -> bool {
        match self.orders.iter().position(|id| *id == order_id) {
            Some(pos) => self.orders.remove(pos).is_some(),
            None => false,
        }
    }

    /// `(price, id)` for every order, in priority order.
    pub fn entries(&self) -> impl Iterator<Item = (Decimal, OrderId)> + '_ {
        self.orders.iter().map(move |id| (self.price, *id))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}
