//! Staged engine state for one operation.
//!
//! An operation reads committed state through the engine and writes only
//! to a [`Plan`]. The plan is applied after the ledger transaction commits,
//! so an error at any step leaves the book, store, escrows and event log as
//! they were.

use std::collections::HashMap;

use hookmatch_types::{BookEvent, Order, OrderId, OrderSide, Trade};
use rust_decimal::Decimal;

#[derive(Debug)]
pub(crate) struct Plan {
    /// Latest state of every order this operation touched.
    pub orders: HashMap<OrderId, Order>,
    /// First-touch order of `orders`, so records are staged deterministically.
    pub touched: Vec<OrderId>,
    /// Escrow overrides. Zero means released.
    pub escrows: HashMap<OrderId, Decimal>,
    /// Orders to take off the book.
    pub removed: Vec<OrderId>,
    /// Order to rest on the book.
    pub rest: Option<(OrderId, OrderSide, Decimal)>,
    pub trades: Vec<Trade>,
    pub events: Vec<BookEvent>,
    pub next_fill_sequence: u64,
}

impl Plan {
    pub fn new(next_fill_sequence: u64) -> Self {
        Self {
            orders: HashMap::new(),
            touched: Vec::new(),
            escrows: HashMap::new(),
            removed: Vec::new(),
            rest: None,
            trades: Vec::new(),
            events: Vec::new(),
            next_fill_sequence,
        }
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn put_order(&mut self, order: Order) {
        if !self.orders.contains_key(&order.id) {
            self.touched.push(order.id);
        }
        self.orders.insert(order.id, order);
    }

    pub fn escrow(&self, id: OrderId) -> Option<Decimal> {
        self.escrows.get(&id).copied()
    }

    pub fn set_escrow(&mut self, id: OrderId, amount: Decimal) {
        self.escrows.insert(id, amount);
    }

    pub fn emit(&mut self, event: BookEvent) {
        self.events.push(event);
    }

    /// Touched orders in first-touch order.
    pub fn touched_orders(&self) -> impl Iterator<Item = &Order> {
        self.touched.iter().filter_map(|id| self.orders.get(id))
    }
}
