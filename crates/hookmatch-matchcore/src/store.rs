//! Packed order storage for one book.
//!
//! Every order ever placed is kept as a [`PackedOrder`] keyed by id.
//! Traders are interned into 32-bit slots so the record stays at four
//! words. Fills and status changes are written with the codec's in-place
//! field updates rather than a full re-encode.

use std::collections::{BTreeSet, HashMap};

use hookmatch_codec::{OrderFields, PackedOrder};
use hookmatch_types::{HookmatchError, MarketPair, Order, OrderId, Result, UserId, constants};

#[derive(Debug)]
pub struct OrderStore {
    market: MarketPair,
    records: HashMap<OrderId, PackedOrder>,
    /// slot -> trader
    traders: Vec<UserId>,
    /// trader -> slot
    slots: HashMap<UserId, u32>,
    /// trader -> ids of their non-terminal orders
    live_by_trader: HashMap<UserId, BTreeSet<OrderId>>,
}

impl OrderStore {
    #[must_use]
    pub fn new(market: MarketPair) -> Self {
        Self {
            market,
            records: HashMap::new(),
            traders: Vec::new(),
            slots: HashMap::new(),
            live_by_trader: HashMap::new(),
        }
    }

    /// Slot `trader` has, or the one it would be given by the next `put`.
    pub fn slot_for(&self, trader: &UserId) -> Result<u32> {
        if let Some(slot) = self.slots.get(trader) {
            return Ok(*slot);
        }
        let next = self.traders.len() as u64;
        if next >= constants::MAX_TRADER_SLOTS {
            return Err(HookmatchError::Internal(format!(
                "trader slots exhausted on {}",
                self.market
            )));
        }
        u32::try_from(next).map_err(|e| HookmatchError::Internal(e.to_string()))
    }

    /// Pack `order` from scratch.
    pub fn encode(&self, order: &Order) -> Result<PackedOrder> {
        let slot = self.slot_for(&order.trader)?;
        PackedOrder::encode(&OrderFields::from_order(order, slot))
    }

    /// The record `order` should be stored as, without storing it.
    ///
    /// Known orders get their stored record with the fill and status
    /// fields rewritten. New orders are encoded in full.
    pub fn stage(&self, order: &Order) -> Result<PackedOrder> {
        match self.records.get(&order.id) {
            Some(existing) => {
                let mut record = *existing;
                record.update_filled(order.filled_amount)?;
                record.update_status(order.status)?;
                Ok(record)
            }
            None => self.encode(order),
        }
    }

    /// Store a record produced by [`OrderStore::stage`].
    pub fn put(&mut self, order: &Order, record: PackedOrder) {
        if !self.slots.contains_key(&order.trader) {
            let slot = u32::try_from(self.traders.len()).unwrap_or(u32::MAX);
            self.slots.insert(order.trader, slot);
            self.traders.push(order.trader);
        }
        self.records.insert(order.id, record);

        if order.is_terminal() {
            if let Some(live) = self.live_by_trader.get_mut(&order.trader) {
                live.remove(&order.id);
                if live.is_empty() {
                    self.live_by_trader.remove(&order.trader);
                }
            }
        } else {
            self.live_by_trader
                .entry(order.trader)
                .or_default()
                .insert(order.id);
        }
    }

    /// Decode the stored order, if any.
    pub fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let Some(record) = self.records.get(&id) else {
            return Ok(None);
        };
        let fields = record.decode()?;
        let trader = self
            .traders
            .get(fields.trader_slot as usize)
            .copied()
            .ok_or_else(|| HookmatchError::CorruptRecord {
                field: "trader_slot",
                reason: format!("slot {} not interned", fields.trader_slot),
            })?;
        Ok(Some(fields.into_order(id, trader, self.market.clone())))
    }

    #[must_use]
    pub fn record(&self, id: OrderId) -> Option<&PackedOrder> {
        self.records.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: OrderId) -> bool {
        self.records.contains_key(&id)
    }

    /// Non-terminal orders of `trader`, oldest first.
    #[must_use]
    pub fn open_order_ids(&self, trader: &UserId) -> Vec<OrderId> {
        self.live_by_trader
            .get(trader)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Orders stored, terminal ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn trader_count(&self) -> usize {
        self.traders.len()
    }
}

#[cfg(test)]
mod tests {
    use hookmatch_types::{OrderSide, OrderStatus};
    use rust_decimal::Decimal;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    fn store() -> OrderStore {
        OrderStore::new(MarketPair::new("BTC", "USDT"))
    }

    fn insert(store: &mut OrderStore, order: &Order) {
        let record = store.stage(order).unwrap();
        store.put(order, record);
    }

    #[test]
    fn put_then_get_returns_same_order() {
        let mut store = store();
        let order = Order::dummy_limit(1, OrderSide::Buy, Decimal::new(10_050, 2), dec(3));
        insert(&mut store, &order);

        assert_eq!(store.get(OrderId(1)).unwrap(), Some(order.clone()));
        assert_eq!(store.open_order_ids(&order.trader), vec![OrderId(1)]);
        assert_eq!(store.get(OrderId(2)).unwrap(), None);
    }

    #[test]
    fn traders_are_interned_once() {
        let mut store = store();
        let a = Order::dummy_limit(1, OrderSide::Buy, dec(100), dec(1));
        let b = Order {
            id: OrderId(2),
            ..a.clone()
        };
        let c = Order::dummy_limit(3, OrderSide::Sell, dec(101), dec(1));

        assert_eq!(store.slot_for(&a.trader).unwrap(), 0);
        insert(&mut store, &a);
        insert(&mut store, &b);
        assert_eq!(store.slot_for(&c.trader).unwrap(), 1);
        insert(&mut store, &c);

        assert_eq!(store.trader_count(), 2);
        assert_eq!(store.record(OrderId(2)).unwrap().trader_slot(), 0);
        assert_eq!(store.record(OrderId(3)).unwrap().trader_slot(), 1);
    }

    #[test]
    fn stage_updates_fill_in_place() {
        let mut store = store();
        let mut order = Order::dummy_limit(1, OrderSide::Sell, dec(100), dec(10));
        insert(&mut store, &order);

        order.apply_fill(dec(4)).unwrap();
        let staged = store.stage(&order).unwrap();
        // staging does not touch the stored record
        assert_eq!(store.get(OrderId(1)).unwrap().unwrap().filled_amount, Decimal::ZERO);

        store.put(&order, staged);
        let back = store.get(OrderId(1)).unwrap().unwrap();
        assert_eq!(back.filled_amount, dec(4));
        assert_eq!(back.status, OrderStatus::PartiallyFilled);
        assert_eq!(back.price, dec(100));
    }

    #[test]
    fn terminal_orders_leave_live_index() {
        let mut store = store();
        let mut order = Order::dummy_limit(1, OrderSide::Buy, dec(100), dec(1));
        insert(&mut store, &order);

        order.cancel().unwrap();
        insert(&mut store, &order);

        assert!(store.open_order_ids(&order.trader).is_empty());
        assert_eq!(
            store.get(OrderId(1)).unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unencodable_order_rejected() {
        let store = store();
        let order = Order::dummy_limit(1, OrderSide::Buy, Decimal::new(1, 9), dec(1));
        assert!(matches!(
            store.stage(&order),
            Err(HookmatchError::PrecisionLoss { .. })
        ));
    }
}
