//! Book sides for a single market pair.
//!
//! Uses `BTreeMap` for price-level ordering:
//! - **Bids** (buys): `BTreeMap<Reverse<Decimal>, PriceLevel>`, highest price first
//! - **Asks** (sells): `BTreeMap<Decimal, PriceLevel>`, lowest price first
//!
//! An auxiliary `HashMap<OrderId, (Side, Price)>` enables O(log N) removal.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use hookmatch_types::{HookmatchError, MarketPair, OrderId, OrderSide, Result};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// Resting order ids for one market, in price-time priority.
#[derive(Debug)]
pub struct OrderBook {
    pub market: MarketPair,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    asks: BTreeMap<Decimal, PriceLevel>,
    /// `OrderId -> (side, price)` for O(log N) removal.
    index: HashMap<OrderId, (OrderSide, Decimal)>,
}

impl OrderBook {
    #[must_use]
    pub fn new(market: MarketPair) -> Self {
        Self {
            market,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    // =================================================================
    // Insertion / removal
    // =================================================================

    /// Rest `order_id` at the back of its price level.
    pub fn insert(&mut self, order_id: OrderId, side: OrderSide, price: Decimal) -> Result<()> {
        if self.index.contains_key(&order_id) {
            return Err(HookmatchError::DuplicateOrder(order_id));
        }
        self.index.insert(order_id, (side, price));
        match side {
            OrderSide::Buy => self
                .bids
                .entry(Reverse(price))
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order_id),
            OrderSide::Sell => self
                .asks
                .entry(price)
                .or_insert_with(|| PriceLevel::new(price))
                .push_back(order_id),
        }
        Ok(())
    }

    /// Take `order_id` off the book. Returns where it rested, or `None`.
    pub fn remove(&mut self, order_id: OrderId) -> Option<(OrderSide, Decimal)> {
        let (side, price) = self.index.remove(&order_id)?;
        match side {
            OrderSide::Buy => {
                if let Some(level) = self.bids.get_mut(&Reverse(price)) {
                    level.remove_order(order_id);
                    if level.is_empty() {
                        self.bids.remove(&Reverse(price));
                    }
                }
            }
            OrderSide::Sell => {
                if let Some(level) = self.asks.get_mut(&price) {
                    level.remove_order(order_id);
                    if level.is_empty() {
                        self.asks.remove(&price);
                    }
                }
            }
        }
        Some((side, price))
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Highest bid and the order at the front of its level.
    #[must_use]
    pub fn best_bid(&self) -> Option<(Decimal, OrderId)> {
        let level = self.bids.values().next()?;
        Some((level.price, level.front()?))
    }

    /// Lowest ask and the order at the front of its level.
    #[must_use]
    pub fn best_ask(&self) -> Option<(Decimal, OrderId)> {
        let level = self.asks.values().next()?;
        Some((level.price, level.front()?))
    }

    /// best ask - best bid. `None` if either side is empty.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Number of resting orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    // =================================================================
    // Iteration
    // =================================================================

    /// Every resting order on `side` as `(price, id)`, best first.
    pub fn queue(&self, side: OrderSide) -> Box<dyn Iterator<Item = (Decimal, OrderId)> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bids.values().flat_map(PriceLevel::entries)),
            OrderSide::Sell => Box::new(self.asks.values().flat_map(PriceLevel::entries)),
        }
    }

    /// Price levels on `side`, best first.
    pub fn levels(&self, side: OrderSide) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            OrderSide::Buy => Box::new(self.bids.values()),
            OrderSide::Sell => Box::new(self.asks.values()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn book() -> OrderBook {
        OrderBook::new(MarketPair::new("BTC", "USDT"))
    }

    #[test]
    fn insert_and_query_best_bid_ask() {
        let mut book = book();
        book.insert(OrderId(1), OrderSide::Buy, dec(100)).unwrap();
        book.insert(OrderId(2), OrderSide::Buy, dec(99)).unwrap();
        book.insert(OrderId(3), OrderSide::Sell, dec(101)).unwrap();
        book.insert(OrderId(4), OrderSide::Sell, dec(102)).unwrap();

        assert_eq!(book.best_bid(), Some((dec(100), OrderId(1))));
        assert_eq!(book.best_ask(), Some((dec(101), OrderId(3))));
        assert_eq!(book.spread(), Some(Decimal::ONE));
        assert_eq!(book.order_count(), 4);
    }

    #[test]
    fn duplicate_rejected() {
        let mut book = book();
        book.insert(OrderId(1), OrderSide::Buy, dec(100)).unwrap();
        assert!(matches!(
            book.insert(OrderId(1), OrderSide::Sell, dec(100)),
            Err(HookmatchError::DuplicateOrder(OrderId(1)))
        ));
    }

    #[test]
    fn remove_cleans_empty_levels() {
        let mut book = book();
        book.insert(OrderId(1), OrderSide::Sell, dec(101)).unwrap();
        book.insert(OrderId(2), OrderSide::Sell, dec(102)).unwrap();

        assert_eq!(book.remove(OrderId(1)), Some((OrderSide::Sell, dec(101))));
        assert_eq!(book.best_ask(), Some((dec(102), OrderId(2))));
        assert_eq!(book.levels(OrderSide::Sell).count(), 1);
        assert_eq!(book.remove(OrderId(1)), None);
    }

    #[test]
    fn queue_is_price_then_time() {
        let mut book = book();
        book.insert(OrderId(1), OrderSide::Buy, dec(99)).unwrap();
        book.insert(OrderId(2), OrderSide::Buy, dec(100)).unwrap();
        book.insert(OrderId(3), OrderSide::Buy, dec(100)).unwrap();
        book.insert(OrderId(4), OrderSide::Buy, dec(98)).unwrap();

        let ids: Vec<OrderId> = book.queue(OrderSide::Buy).map(|(_, id)| id).collect();
        assert_eq!(ids, vec![OrderId(2), OrderId(3), OrderId(1), OrderId(4)]);
        assert!(book.queue(OrderSide::Sell).next().is_none());
    }

    #[test]
    fn empty_book() {
        let book = book();
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.spread(), None);
    }
}
