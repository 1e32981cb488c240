//! Continuous price-time matching for one book.
//!
//! Every mutating call follows the same shape:
//!
//! 1. lock the shared ledger and open a [`LedgerTxn`]
//! 2. plan the operation against committed state plus a [`Plan`] overlay,
//!    calling the hook at each call-point
//! 3. stage the packed order records
//! 4. call the closing hook (`after_place_order` / `after_cancel_order`)
//! 5. commit the ledger transaction, then apply the plan
//!
//! Steps 1-4 may fail at any point and leave nothing behind. Step 5 cannot
//! fail, so a hook that returned from its closing call has seen an
//! operation that will commit.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, MutexGuard};

use chrono::{DateTime, Utc};
use hookmatch_codec::PackedOrder;
use hookmatch_hooks::{BookHook, HookCapabilities, HookDispatcher, HookPayload, MatchContext};
use hookmatch_ledger::{BalanceLedger, LedgerTxn, SharedLedger};
use hookmatch_types::{
    BookConfig, BookEvent, FeeQuote, HookmatchError, MarketPair, Order, OrderId, OrderSide,
    OrderStatus, OrderType, RemovalReason, Result, SequencedEvent, Trade, TradeId, UserId,
    constants, quote_value,
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::determinism::compute_trade_root;
use crate::events::{EventLog, EventSink};
use crate::orderbook::OrderBook;
use crate::plan::Plan;
use crate::request::{BookDepth, DepthLevel, OrderRequest, PlaceOutcome};
use crate::store::OrderStore;

/// A single-market order book bound to one hook and a shared ledger.
///
/// All mutation goes through `&mut self`, so a book has exactly one writer.
/// The ledger mutex is held for the whole of each operation; hooks must not
/// try to lock it.
pub struct MatchingEngine {
    config: BookConfig,
    book: OrderBook,
    store: OrderStore,
    /// Funds still locked on behalf of each live order.
    escrows: HashMap<OrderId, Decimal>,
    ledger: SharedLedger,
    hooks: HookDispatcher,
    next_order_id: OrderId,
    fill_sequence: u64,
    trades: Vec<Trade>,
    events: EventLog,
}

impl MatchingEngine {
    /// Create a book for `config.market`, bound to `hook` for its lifetime.
    pub fn new(config: BookConfig, ledger: SharedLedger, hook: Arc<dyn BookHook>) -> Result<Self> {
        config.validate()?;
        let market = config.market.clone();
        let hooks = HookDispatcher::new(hook);
        info!(
            market = %market,
            capabilities = ?hooks.capabilities(),
            max_market_matches = config.max_market_matches,
            "book created"
        );
        Ok(Self {
            book: OrderBook::new(market.clone()),
            store: OrderStore::new(market.clone()),
            escrows: HashMap::new(),
            ledger,
            hooks,
            next_order_id: OrderId::FIRST,
            fill_sequence: 0,
            trades: Vec::new(),
            events: EventLog::new(market),
            config,
        })
    }

    // =================================================================
    // Mutations
    // =================================================================

    /// Place an order, cross it against the opposite side, and rest any
    /// limit remainder.
    ///
    /// # Errors
    /// - `InvalidPrice` / `InvalidAmount` for malformed requests, before or
    ///   after the hook's adjustment
    /// - `InsufficientBalance` if the escrow cannot be locked
    /// - `InvalidHookResponse` / `HookCallFailed` from any call-point
    /// - codec errors if a value cannot be stored
    ///
    /// On error nothing is committed: no order id is consumed, no funds
    /// move and no events are published.
    pub fn place_order(
        &mut self,
        request: OrderRequest,
        payload: &HookPayload,
    ) -> Result<PlaceOutcome> {
        let ledger = Arc::clone(&self.ledger);
        let mut guard = lock_ledger(&ledger)?;
        let mut txn = guard.begin();

        let (plan, order) = self.plan_placement(&mut txn, request, payload)?;
        let records = self.stage_records(&plan)?;
        self.hooks.after_place_order(&order, payload)?;
        txn.commit();
        drop(guard);

        let trades = plan.trades.clone();
        self.next_order_id = order.id.next();
        self.apply(plan, records);

        info!(
            market = %self.config.market,
            order_id = %order.id,
            trader = %order.trader,
            side = %order.side,
            order_type = %order.order_type,
            status = %order.status,
            filled = %order.filled_amount,
            fills = trades.len(),
            "order placed"
        );
        Ok(PlaceOutcome { order, trades })
    }

    /// Cancel a live order on behalf of `caller`.
    ///
    /// # Errors
    /// - `OrderNotFound` if the id is unknown or the order is terminal
    /// - `Unauthorized` if `caller` does not own it
    /// - `CancelRejected` if the hook vetoes
    pub fn cancel_order(
        &mut self,
        order_id: OrderId,
        caller: &UserId,
        payload: &HookPayload,
    ) -> Result<Order> {
        let mut order = match self.store.get(order_id)? {
            Some(order) if !order.is_terminal() => order,
            _ => return Err(HookmatchError::OrderNotFound(order_id)),
        };
        if order.trader != *caller {
            return Err(HookmatchError::Unauthorized {
                order_id,
                caller: *caller,
            });
        }
        self.hooks.before_cancel_order(&order, payload)?;

        let ledger = Arc::clone(&self.ledger);
        let mut guard = lock_ledger(&ledger)?;
        let mut txn = guard.begin();

        let mut plan = Plan::new(self.fill_sequence);
        self.release_escrow(&mut txn, &mut plan, &order)?;
        let from = order.status;
        order.cancel()?;
        plan.removed.push(order_id);
        plan.emit(BookEvent::OrderStatusChanged {
            order_id,
            from,
            to: order.status,
        });
        plan.emit(BookEvent::OrderRemovedFromBook {
            order_id,
            reason: RemovalReason::Cancelled,
        });
        plan.put_order(order.clone());

        let records = self.stage_records(&plan)?;
        self.hooks.after_cancel_order(&order, payload)?;
        txn.commit();
        drop(guard);
        self.apply(plan, records);

        info!(
            market = %self.config.market,
            order_id = %order_id,
            trader = %order.trader,
            filled = %order.filled_amount,
            "order cancelled"
        );
        Ok(order)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Any order this book has accepted, terminal ones included.
    pub fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)?
            .ok_or(HookmatchError::OrderNotFound(order_id))
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<(Decimal, OrderId)> {
        self.book.best_bid()
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<(Decimal, OrderId)> {
        self.book.best_ask()
    }

    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        self.book.spread()
    }

    /// Up to `levels` aggregated price levels per side, best first.
    pub fn depth(&self, levels: usize) -> Result<BookDepth> {
        Ok(BookDepth {
            bids: self.depth_side(OrderSide::Buy, levels)?,
            asks: self.depth_side(OrderSide::Sell, levels)?,
        })
    }

    /// Live orders of `trader`, oldest first.
    pub fn open_orders(&self, trader: &UserId) -> Result<Vec<Order>> {
        self.store
            .open_order_ids(trader)
            .into_iter()
            .map(|id| self.resting(id))
            .collect()
    }

    /// Number of orders resting on the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.book.order_count()
    }

    /// Funds still locked for `order_id` (zero once it left the book).
    #[must_use]
    pub fn escrow_of(&self, order_id: OrderId) -> Decimal {
        self.escrows.get(&order_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Every trade executed on this book, in fill order.
    #[must_use]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    #[must_use]
    pub fn trade_root(&self) -> [u8; 32] {
        compute_trade_root(&self.trades)
    }

    /// Published events not yet drained.
    #[must_use]
    pub fn events(&self) -> &[SequencedEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<SequencedEvent> {
        self.events.drain()
    }

    /// Subscribe `sink` to every event committed from now on.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.events.add_sink(sink);
    }

    #[must_use]
    pub fn market(&self) -> &MarketPair {
        &self.config.market
    }

    #[must_use]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    #[must_use]
    pub fn capabilities(&self) -> HookCapabilities {
        self.hooks.capabilities()
    }

    #[must_use]
    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    // =================================================================
    // Placement planning
    // =================================================================

    fn plan_placement(
        &self,
        txn: &mut LedgerTxn<'_>,
        request: OrderRequest,
        payload: &HookPayload,
    ) -> Result<(Plan, Order)> {
        let proposed = self.build_order(request)?;

        let mut order = self.hooks.before_place_order(&proposed, payload)?;
        if order != proposed {
            validate_order(&order)?;
            debug!(
                order_id = %order.id,
                price = %order.price,
                amount = %order.original_amount,
                "order adjusted by hook"
            );
        }
        // Unrepresentable prices or amounts fail here, before custody is touched.
        self.store.encode(&order)?;

        let mut plan = Plan::new(self.fill_sequence);
        plan.emit(BookEvent::OrderPlaced {
            order_id: order.id,
            trader: order.trader,
            side: order.side,
            order_type: order.order_type,
            price: order.price,
            amount: order.original_amount,
        });

        let escrow = self.initial_escrow(&order)?;
        txn.lock(&order.trader, self.escrow_asset(order.side), escrow)?;
        plan.set_escrow(order.id, escrow);

        let mut crosses = 0usize;
        for (price, maker_id) in self.book.queue(order.side.opposite()) {
            if order.is_filled() || !order.crosses(price) {
                break;
            }
            if order.is_market() && crosses >= self.config.max_market_matches {
                break;
            }
            let maker = self.resting_in(&plan, maker_id)?;
            self.execute_cross(txn, &mut plan, &mut order, maker, price, payload)?;
            crosses += 1;
        }

        if order.is_filled() {
            self.release_escrow(txn, &mut plan, &order)?;
        } else if order.is_market() {
            let from = order.status;
            order.cancel()?;
            self.release_escrow(txn, &mut plan, &order)?;
            plan.emit(BookEvent::OrderStatusChanged {
                order_id: order.id,
                from,
                to: order.status,
            });
            plan.emit(BookEvent::OrderRemovedFromBook {
                order_id: order.id,
                reason: RemovalReason::PartialMarketFill,
            });
            debug!(
                order_id = %order.id,
                discarded = %order.remaining(),
                crosses,
                "market remainder discarded"
            );
        } else {
            if self.book.contains(order.id) {
                return Err(HookmatchError::DuplicateOrder(order.id));
            }
            plan.rest = Some((order.id, order.side, order.price));
            plan.emit(BookEvent::OrderAddedToBook {
                order_id: order.id,
                side: order.side,
                price: order.price,
                remaining: order.remaining(),
            });
            self.hooks.on_order_added_to_book(&order, payload)?;
        }

        plan.put_order(order.clone());
        Ok((plan, order))
    }

    fn build_order(&self, request: OrderRequest) -> Result<Order> {
        let price = match (request.order_type, request.price) {
            (OrderType::Limit, Some(price)) => price,
            (OrderType::Limit, None) => {
                return Err(HookmatchError::InvalidPrice {
                    reason: "limit order requires a price".into(),
                });
            }
            (OrderType::Market, None) => Decimal::ZERO,
            (OrderType::Market, Some(price)) => {
                return Err(HookmatchError::InvalidPrice {
                    reason: format!("market order carries price {price}"),
                });
            }
        };
        let order = Order {
            id: self.next_order_id,
            trader: request.trader,
            market: self.config.market.clone(),
            side: request.side,
            order_type: request.order_type,
            price,
            original_amount: request.amount,
            filled_amount: Decimal::ZERO,
            status: OrderStatus::Active,
            placed_at: now_millis(),
        };
        validate_order(&order)?;
        Ok(order)
    }

    /// One cross between `taker` and `maker` at the maker's `price`.
    fn execute_cross(
        &self,
        txn: &mut LedgerTxn<'_>,
        plan: &mut Plan,
        taker: &mut Order,
        mut maker: Order,
        price: Decimal,
        payload: &HookPayload,
    ) -> Result<()> {
        let amount = taker.remaining().min(maker.remaining());
        let ctx = MatchContext {
            market: &self.config.market,
            taker,
            maker: &maker,
            price,
            amount,
            trade_value: quote_value(price, amount)?,
        };
        let terms = self.hooks.before_match(&ctx, payload)?;
        let exec_price = terms.price;
        let quote_amount = quote_value(exec_price, amount)?;
        let fees = terms.fees;

        self.settle_cross(txn, plan, taker, &maker, amount, quote_amount, &fees)?;

        let fill_sequence = plan.next_fill_sequence;
        plan.next_fill_sequence += 1;
        let trade = Trade {
            id: TradeId::deterministic(&self.config.market, fill_sequence),
            market: self.config.market.clone(),
            fill_sequence,
            taker_order_id: taker.id,
            taker: taker.trader,
            maker_order_id: maker.id,
            maker: maker.trader,
            taker_side: taker.side,
            price: exec_price,
            amount,
            quote_amount,
            fees,
            executed_at: Utc::now(),
        };
        self.hooks.after_match(&trade, payload)?;

        let taker_from = taker.status;
        let maker_from = maker.status;
        taker.apply_fill(amount)?;
        maker.apply_fill(amount)?;

        debug!(
            trade_id = %trade.id,
            taker = %taker.id,
            maker = %maker.id,
            price = %exec_price,
            amount = %amount,
            taker_fee = %fees.taker_fee,
            "match executed"
        );

        plan.emit(BookEvent::MatchExecuted {
            trade: trade.clone(),
        });
        if taker.status != taker_from {
            plan.emit(BookEvent::OrderStatusChanged {
                order_id: taker.id,
                from: taker_from,
                to: taker.status,
            });
        }
        if maker.status != maker_from {
            plan.emit(BookEvent::OrderStatusChanged {
                order_id: maker.id,
                from: maker_from,
                to: maker.status,
            });
        }
        if maker.is_filled() {
            self.release_escrow(txn, plan, &maker)?;
            plan.removed.push(maker.id);
            plan.emit(BookEvent::OrderRemovedFromBook {
                order_id: maker.id,
                reason: RemovalReason::Filled,
            });
        }
        plan.put_order(maker);
        plan.trades.push(trade);
        Ok(())
    }

    /// Move both legs, then the taker fee and maker rebate.
    ///
    /// The seller's base and the buyer's quote come out of their escrow;
    /// any shortfall is locked from available first. A selling taker pays
    /// its fee out of the quote it just received.
    #[allow(clippy::too_many_arguments)]
    fn settle_cross(
        &self,
        txn: &mut LedgerTxn<'_>,
        plan: &mut Plan,
        taker: &Order,
        maker: &Order,
        amount: Decimal,
        quote_amount: Decimal,
        fees: &FeeQuote,
    ) -> Result<()> {
        let market = &self.config.market;
        let (buyer, seller) = match taker.side {
            OrderSide::Buy => (taker, maker),
            OrderSide::Sell => (maker, taker),
        };

        self.draw(txn, plan, seller, amount)?;
        txn.settle(&seller.trader, &buyer.trader, &market.base, amount)?;
        self.draw(txn, plan, buyer, quote_amount)?;
        txn.settle(&buyer.trader, &seller.trader, &market.quote, quote_amount)?;

        if fees.taker_fee.is_zero() {
            return Ok(());
        }
        match taker.side {
            OrderSide::Buy => self.draw(txn, plan, taker, fees.taker_fee)?,
            OrderSide::Sell => txn.lock(&taker.trader, &market.quote, fees.taker_fee)?,
        }
        txn.settle(
            &taker.trader,
            &self.config.fee_collector,
            &market.quote,
            fees.pool_retained,
        )?;
        txn.settle(&taker.trader, &maker.trader, &market.quote, fees.maker_rebate)
    }

    // =================================================================
    // Escrow
    // =================================================================

    fn escrow_asset(&self, side: OrderSide) -> &str {
        match side {
            OrderSide::Buy => &self.config.market.quote,
            OrderSide::Sell => &self.config.market.base,
        }
    }

    fn escrow_in(&self, plan: &Plan, order_id: OrderId) -> Decimal {
        plan.escrow(order_id)
            .unwrap_or_else(|| self.escrow_of(order_id))
    }

    fn initial_escrow(&self, order: &Order) -> Result<Decimal> {
        match (order.side, order.order_type) {
            (OrderSide::Sell, _) => Ok(order.original_amount),
            (OrderSide::Buy, OrderType::Limit) => {
                self.with_fee_reserve(quote_value(order.price, order.original_amount)?)
            }
            (OrderSide::Buy, OrderType::Market) => {
                let cost = self.market_buy_cost(order.original_amount)?;
                self.with_fee_reserve(cost)
            }
        }
    }

    /// Quote needed to sweep `amount` from the asks a market buy can reach.
    fn market_buy_cost(&self, amount: Decimal) -> Result<Decimal> {
        let mut left = amount;
        let mut cost = Decimal::ZERO;
        for (price, id) in self
            .book
            .queue(OrderSide::Sell)
            .take(self.config.max_market_matches)
        {
            if left <= Decimal::ZERO {
                break;
            }
            let take = left.min(self.resting(id)?.remaining());
            cost = cost
                .checked_add(quote_value(price, take)?)
                .ok_or_else(|| HookmatchError::InvalidAmount {
                    reason: format!("market buy of {amount} overflows quote cost"),
                })?;
            left -= take;
        }
        Ok(cost)
    }

    fn with_fee_reserve(&self, value: Decimal) -> Result<Decimal> {
        let denominator = Decimal::from(constants::BPS_DENOMINATOR);
        let factor = (denominator + Decimal::from(self.config.fee_reserve_bps)) / denominator;
        value
            .checked_mul(factor)
            .map(|v| {
                v.round_dp_with_strategy(constants::QUOTE_PRECISION, RoundingStrategy::AwayFromZero)
            })
            .ok_or_else(|| HookmatchError::InvalidAmount {
                reason: format!("escrow for quote value {value} overflows"),
            })
    }

    /// Consume `amount` of `order`'s escrow, locking any shortfall.
    fn draw(
        &self,
        txn: &mut LedgerTxn<'_>,
        plan: &mut Plan,
        order: &Order,
        amount: Decimal,
    ) -> Result<()> {
        let escrow = self.escrow_in(plan, order.id);
        let covered = escrow.min(amount);
        let shortfall = amount - covered;
        if shortfall > Decimal::ZERO {
            txn.lock(&order.trader, self.escrow_asset(order.side), shortfall)?;
        }
        plan.set_escrow(order.id, escrow - covered);
        Ok(())
    }

    /// Unlock whatever escrow `order` still holds.
    fn release_escrow(&self, txn: &mut LedgerTxn<'_>, plan: &mut Plan, order: &Order) -> Result<()> {
        let escrow = self.escrow_in(plan, order.id);
        if escrow > Decimal::ZERO {
            txn.unlock(&order.trader, self.escrow_asset(order.side), escrow)?;
        }
        plan.set_escrow(order.id, Decimal::ZERO);
        Ok(())
    }

    // =================================================================
    // Commit
    // =================================================================

    fn stage_records(&self, plan: &Plan) -> Result<Vec<(Order, PackedOrder)>> {
        let mut records = Vec::with_capacity(plan.touched.len());
        for order in plan.touched_orders() {
            records.push((order.clone(), self.store.stage(order)?));
        }
        Ok(records)
    }

    fn apply(&mut self, plan: Plan, records: Vec<(Order, PackedOrder)>) {
        let Plan {
            escrows,
            removed,
            rest,
            trades,
            events,
            next_fill_sequence,
            ..
        } = plan;

        for id in removed {
            self.book.remove(id);
        }
        if let Some((id, side, price)) = rest {
            let rested = self.book.insert(id, side, price);
            debug_assert!(rested.is_ok(), "{id} was checked absent from the book before commit");
        }
        for (order, record) in records {
            self.store.put(&order, record);
        }
        for (id, amount) in escrows {
            if amount.is_zero() {
                self.escrows.remove(&id);
            } else {
                self.escrows.insert(id, amount);
            }
        }
        self.trades.extend(trades);
        self.fill_sequence = next_fill_sequence;
        self.events.append_all(events);
    }

    // =================================================================
    // Helpers
    // =================================================================

    fn resting(&self, order_id: OrderId) -> Result<Order> {
        self.store
            .get(order_id)?
            .ok_or_else(|| HookmatchError::Internal(format!("{order_id} on book but not stored")))
    }

    fn resting_in(&self, plan: &Plan, order_id: OrderId) -> Result<Order> {
        match plan.order(order_id) {
            Some(order) => Ok(order.clone()),
            None => self.resting(order_id),
        }
    }

    fn depth_side(&self, side: OrderSide, levels: usize) -> Result<Vec<DepthLevel>> {
        let mut out = Vec::new();
        for level in self.book.levels(side).take(levels) {
            let mut amount = Decimal::ZERO;
            for id in &level.orders {
                amount += self.resting(*id)?.remaining();
            }
            out.push(DepthLevel {
                price: level.price,
                amount,
                order_count: level.len(),
            });
        }
        Ok(out)
    }
}

impl fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("market", &self.config.market)
            .field("resting", &self.book.order_count())
            .field("stored", &self.store.len())
            .field("next_order_id", &self.next_order_id)
            .field("fill_sequence", &self.fill_sequence)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn lock_ledger(ledger: &SharedLedger) -> Result<MutexGuard<'_, BalanceLedger>> {
    ledger
        .lock()
        .map_err(|_| HookmatchError::Internal("ledger mutex poisoned".into()))
}

fn validate_order(order: &Order) -> Result<()> {
    if order.original_amount <= Decimal::ZERO {
        return Err(HookmatchError::InvalidAmount {
            reason: format!("amount must be positive, got {}", order.original_amount),
        });
    }
    if order.order_type == OrderType::Limit && order.price <= Decimal::ZERO {
        return Err(HookmatchError::InvalidPrice {
            reason: format!("limit price must be positive, got {}", order.price),
        });
    }
    Ok(())
}

/// Current time at the millisecond resolution orders are stored with.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use hookmatch_hooks::NoOpHook;

    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    struct Fixture {
        engine: MatchingEngine,
        ledger: SharedLedger,
        buyer: UserId,
        seller: UserId,
    }

    fn fixture() -> Fixture {
        let ledger = BalanceLedger::new().shared();
        let buyer = UserId::new();
        let seller = UserId::new();
        {
            let mut l = ledger.lock().unwrap();
            l.deposit(&buyer, "USDT", dec(10_000)).unwrap();
            l.deposit(&seller, "BTC", dec(50)).unwrap();
        }
        let engine = MatchingEngine::new(
            BookConfig::btc_usdt(UserId::new()),
            Arc::clone(&ledger),
            Arc::new(NoOpHook),
        )
        .unwrap();
        Fixture {
            engine,
            ledger,
            buyer,
            seller,
        }
    }

    fn payload() -> HookPayload {
        HookPayload::empty()
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = BookConfig::btc_usdt(UserId::new());
        config.max_market_matches = 0;
        let err = MatchingEngine::new(config, BalanceLedger::new().shared(), Arc::new(NoOpHook))
            .unwrap_err();
        assert!(matches!(err, HookmatchError::Configuration(_)));
    }

    #[test]
    fn validation_errors_consume_nothing() {
        let mut f = fixture();
        let bad = [
            OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), Decimal::ZERO),
            OrderRequest::limit(f.buyer, OrderSide::Buy, dec(-1), dec(1)),
            OrderRequest {
                price: None,
                ..OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(1))
            },
            OrderRequest {
                price: Some(dec(100)),
                ..OrderRequest::market(f.buyer, OrderSide::Buy, dec(1))
            },
        ];
        for request in bad {
            let err = f.engine.place_order(request, &payload()).unwrap_err();
            assert!(matches!(
                err,
                HookmatchError::InvalidAmount { .. } | HookmatchError::InvalidPrice { .. }
            ));
        }

        let ok = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(1)),
                &payload(),
            )
            .unwrap();
        assert_eq!(ok.order.id, OrderId::FIRST);
        assert_eq!(f.engine.events()[0].sequence, 0);
    }

    #[test]
    fn limit_buy_locks_value_plus_reserve() {
        let mut f = fixture();
        let out = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(10)),
                &payload(),
            )
            .unwrap();

        // 1000 * 1.01
        assert_eq!(f.engine.escrow_of(out.order.id), dec(1010));
        let bal = f.ledger.lock().unwrap().balance(&f.buyer, "USDT");
        assert_eq!(bal.locked, dec(1010));
        assert_eq!(bal.available, dec(8990));
        assert_eq!(f.engine.best_bid(), Some((dec(100), out.order.id)));
    }

    #[test]
    fn cross_settles_and_keeps_escrow_in_step() {
        let mut f = fixture();
        let bid = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(10)),
                &payload(),
            )
            .unwrap();
        let ask = f
            .engine
            .place_order(
                OrderRequest::limit(f.seller, OrderSide::Sell, dec(100), dec(5)),
                &payload(),
            )
            .unwrap();

        assert_eq!(ask.trades.len(), 1);
        assert_eq!(ask.order.status, OrderStatus::Filled);
        assert_eq!(f.engine.escrow_of(bid.order.id), dec(510));
        assert_eq!(f.engine.escrow_of(ask.order.id), Decimal::ZERO);

        let ledger = f.ledger.lock().unwrap();
        assert_eq!(ledger.balance(&f.buyer, "BTC").available, dec(5));
        assert_eq!(ledger.balance(&f.buyer, "USDT").locked, dec(510));
        assert_eq!(ledger.balance(&f.seller, "USDT").available, dec(500));
        assert_eq!(ledger.balance(&f.seller, "BTC").locked, Decimal::ZERO);
        ledger.verify_all().unwrap();
    }

    #[test]
    fn insufficient_balance_leaves_book_untouched() {
        let mut f = fixture();
        let err = f
            .engine
            .place_order(
                OrderRequest::limit(f.seller, OrderSide::Sell, dec(100), dec(51)),
                &payload(),
            )
            .unwrap_err();
        assert!(matches!(err, HookmatchError::InsufficientBalance { .. }));
        assert_eq!(f.engine.order_count(), 0);
        assert!(f.engine.events().is_empty());
        assert!(matches!(
            f.engine.get_order(OrderId::FIRST),
            Err(HookmatchError::OrderNotFound(_))
        ));
        assert_eq!(
            f.ledger.lock().unwrap().balance(&f.seller, "BTC").available,
            dec(50)
        );
    }

    #[test]
    fn cancel_releases_escrow() {
        let mut f = fixture();
        let bid = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(10)),
                &payload(),
            )
            .unwrap();

        let cancelled = f
            .engine
            .cancel_order(bid.order.id, &f.buyer, &payload())
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(f.engine.order_count(), 0);
        assert_eq!(f.engine.escrow_of(bid.order.id), Decimal::ZERO);
        assert!(f.engine.open_orders(&f.buyer).unwrap().is_empty());

        let bal = f.ledger.lock().unwrap().balance(&f.buyer, "USDT");
        assert_eq!(bal.available, dec(10_000));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn cancel_by_non_owner_rejected() {
        let mut f = fixture();
        let bid = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(1)),
                &payload(),
            )
            .unwrap();
        let err = f
            .engine
            .cancel_order(bid.order.id, &f.seller, &payload())
            .unwrap_err();
        assert!(matches!(err, HookmatchError::Unauthorized { .. }));
        assert_eq!(f.engine.order_count(), 1);

        assert!(matches!(
            f.engine.cancel_order(OrderId(99), &f.buyer, &payload()),
            Err(HookmatchError::OrderNotFound(OrderId(99)))
        ));
    }

    #[test]
    fn market_buy_sweeps_and_never_rests() {
        let mut f = fixture();
        for price in [100, 101] {
            f.engine
                .place_order(
                    OrderRequest::limit(f.seller, OrderSide::Sell, dec(price), dec(1)),
                    &payload(),
                )
                .unwrap();
        }
        let out = f
            .engine
            .place_order(
                OrderRequest::market(f.buyer, OrderSide::Buy, dec(3)),
                &payload(),
            )
            .unwrap();

        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.filled(), dec(2));
        assert_eq!(out.order.status, OrderStatus::Cancelled);
        assert_eq!(f.engine.order_count(), 0);
        assert_eq!(f.engine.escrow_of(out.order.id), Decimal::ZERO);

        let ledger = f.ledger.lock().unwrap();
        assert_eq!(ledger.balance(&f.buyer, "USDT").locked, Decimal::ZERO);
        assert_eq!(ledger.balance(&f.buyer, "USDT").available, dec(10_000 - 201));
    }

    #[test]
    fn resting_id_already_on_book_fails_before_commit() {
        let mut f = fixture();
        f.engine
            .book
            .insert(OrderId::FIRST, OrderSide::Sell, dec(500))
            .unwrap();

        let err = f
            .engine
            .place_order(
                OrderRequest::limit(f.buyer, OrderSide::Buy, dec(100), dec(1)),
                &payload(),
            )
            .unwrap_err();
        assert!(matches!(err, HookmatchError::DuplicateOrder(id) if id == OrderId::FIRST));
        assert!(f.engine.events().is_empty());
        assert_eq!(f.engine.escrow_of(OrderId::FIRST), Decimal::ZERO);
        let bal = f.ledger.lock().unwrap().balance(&f.buyer, "USDT");
        assert_eq!(bal.available, dec(10_000));
        assert_eq!(bal.locked, Decimal::ZERO);
    }

    #[test]
    fn depth_aggregates_levels() {
        let mut f = fixture();
        for (price, amount) in [(100, 1), (100, 2), (99, 4)] {
            f.engine
                .place_order(
                    OrderRequest::limit(f.buyer, OrderSide::Buy, dec(price), dec(amount)),
                    &payload(),
                )
                .unwrap();
        }
        let depth = f.engine.depth(1).unwrap();
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].price, dec(100));
        assert_eq!(depth.bids[0].amount, dec(3));
        assert_eq!(depth.bids[0].order_count, 2);
        assert!(depth.asks.is_empty());
        assert_eq!(f.engine.open_orders(&f.buyer).unwrap().len(), 3);
    }
}
