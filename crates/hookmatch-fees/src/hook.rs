//! The fee engine as a book hook.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use hookmatch_hooks::{
    BookHook, HookCapabilities, HookMethod, HookPayload, HookResponse, HookResult, MatchContext,
    MatchDelta, OrderDelta,
};
use hookmatch_types::{MarketPair, Order, OrderId, Trade, UserId};
use rust_decimal::Decimal;

use crate::FeeTierEngine;

/// A fill seen by `after_match` whose placement has not finished yet.
#[derive(Debug, Clone, Copy)]
struct StagedFill {
    taker: UserId,
    maker: UserId,
    value: Decimal,
    at: DateTime<Utc>,
}

/// Prices every cross through a shared [`FeeTierEngine`] and feeds executed
/// volume back into it.
///
/// Fills are held per placement and only counted toward rolling volume in
/// `after_place_order`, the last call a book makes before committing. A
/// placement that aborts earlier leaves its fills staged; the book reuses
/// the aborted order id for its next placement, and `before_place_order`
/// drops them then.
#[derive(Debug)]
pub struct FeeHook {
    engine: Arc<FeeTierEngine>,
    staged: Mutex<HashMap<(MarketPair, OrderId), Vec<StagedFill>>>,
}

impl FeeHook {
    #[must_use]
    pub fn new(engine: Arc<FeeTierEngine>) -> Self {
        Self {
            engine,
            staged: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<FeeTierEngine> {
        &self.engine
    }

    /// Fills waiting on an unfinished placement.
    #[must_use]
    pub fn staged_fills(&self) -> usize {
        self.staged().values().map(Vec::len).sum()
    }

    fn staged(&self) -> MutexGuard<'_, HashMap<(MarketPair, OrderId), Vec<StagedFill>>> {
        self.staged.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BookHook for FeeHook {
    fn capabilities(&self) -> HookCapabilities {
        HookCapabilities::none()
            .with(HookMethod::BeforePlaceOrder)
            .with(HookMethod::AfterPlaceOrder)
            .with(HookMethod::BeforeMatch)
            .with(HookMethod::AfterMatch)
    }

    fn before_place_order(&self, order: &Order, _payload: &HookPayload) -> HookResult<OrderDelta> {
        let stale = self.staged().remove(&(order.market.clone(), order.id));
        if let Some(fills) = stale {
            tracing::debug!(
                market = %order.market,
                order_id = %order.id,
                dropped = fills.len(),
                "dropped fills of aborted placement"
            );
        }
        Ok(HookResponse::new(HookMethod::BeforePlaceOrder, OrderDelta::NONE))
    }

    fn after_place_order(&self, order: &Order, _payload: &HookPayload) -> HookResult<()> {
        let fills = self
            .staged()
            .remove(&(order.market.clone(), order.id))
            .unwrap_or_default();
        for fill in fills {
            self.engine
                .record_fill(fill.taker, fill.maker, fill.value, fill.at);
        }
        Ok(HookResponse::ack(HookMethod::AfterPlaceOrder))
    }

    fn before_match(&self, ctx: &MatchContext<'_>, _payload: &HookPayload) -> HookResult<MatchDelta> {
        let fees = self
            .engine
            .compute_fees(&ctx.taker.trader, &ctx.maker.trader, ctx.trade_value);
        Ok(HookResponse::new(
            HookMethod::BeforeMatch,
            MatchDelta::with_fees(fees),
        ))
    }

    fn after_match(&self, trade: &Trade, _payload: &HookPayload) -> HookResult<()> {
        self.staged()
            .entry((trade.market.clone(), trade.taker_order_id))
            .or_default()
            .push(StagedFill {
                taker: trade.taker,
                maker: trade.maker,
                value: trade.quote_amount,
                at: trade.executed_at,
            });
        Ok(HookResponse::ack(HookMethod::AfterMatch))
    }
}
