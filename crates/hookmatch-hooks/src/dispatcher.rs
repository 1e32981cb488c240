//! Checked dispatch of call-points to a book's hook.

use std::fmt;
use std::sync::Arc;

use hookmatch_types::{FeeQuote, HookmatchError, Order, OrderType, Result, Trade, quote_value};
use rust_decimal::Decimal;

use crate::{
    BookHook, CancelVerdict, HookCapabilities, HookMethod, HookPayload, HookResponse, HookResult,
    MatchContext, MatchTerms,
};

/// Owns a book's hook and enforces the protocol on every call.
///
/// Call-points the hook is not wired for return the no-op answer without
/// calling it. Wired call-points must echo the right token and stay within
/// delta bounds, or the call fails with `InvalidHookResponse`.
#[derive(Clone)]
pub struct HookDispatcher {
    hook: Arc<dyn BookHook>,
    capabilities: HookCapabilities,
}

impl HookDispatcher {
    /// Bind `hook`. Its capability set is read once here.
    pub fn new(hook: Arc<dyn BookHook>) -> Self {
        let capabilities = hook.capabilities();
        Self { hook, capabilities }
    }

    #[must_use]
    pub fn capabilities(&self) -> HookCapabilities {
        self.capabilities
    }

    /// Ask the hook about an incoming order and return it with the hook's
    /// delta applied.
    ///
    /// The adjusted order still has to pass the book's own validation; this
    /// only rejects deltas that cannot be applied at all.
    pub fn before_place_order(&self, order: &Order, payload: &HookPayload) -> Result<Order> {
        let method = HookMethod::BeforePlaceOrder;
        if !self.capabilities.contains(method) {
            return Ok(order.clone());
        }
        let delta = unwrap_response(method, self.hook.before_place_order(order, payload))?;
        if order.order_type == OrderType::Market && !delta.price_adjustment.is_zero() {
            return Err(reject(
                method,
                format!("price adjustment {} on market {}", delta.price_adjustment, order.id),
            ));
        }

        let mut adjusted = order.clone();
        adjusted.price = order
            .price
            .checked_add(delta.price_adjustment)
            .ok_or_else(|| {
                reject(
                    method,
                    format!("price adjustment {} overflows {}", delta.price_adjustment, order.id),
                )
            })?;
        adjusted.original_amount = order
            .original_amount
            .checked_add(delta.amount_adjustment)
            .ok_or_else(|| {
                reject(
                    method,
                    format!("amount adjustment {} overflows {}", delta.amount_adjustment, order.id),
                )
            })?;
        Ok(adjusted)
    }

    pub fn after_place_order(&self, order: &Order, payload: &HookPayload) -> Result<()> {
        let method = HookMethod::AfterPlaceOrder;
        if !self.capabilities.contains(method) {
            return Ok(());
        }
        unwrap_response(method, self.hook.after_place_order(order, payload))
    }

    pub fn on_order_added_to_book(&self, order: &Order, payload: &HookPayload) -> Result<()> {
        let method = HookMethod::OnOrderAddedToBook;
        if !self.capabilities.contains(method) {
            return Ok(());
        }
        unwrap_response(method, self.hook.on_order_added_to_book(order, payload))
    }

    /// # Errors
    /// `CancelRejected` if the hook vetoes.
    pub fn before_cancel_order(&self, order: &Order, payload: &HookPayload) -> Result<()> {
        let method = HookMethod::BeforeCancelOrder;
        if !self.capabilities.contains(method) {
            return Ok(());
        }
        match unwrap_response(method, self.hook.before_cancel_order(order, payload))? {
            CancelVerdict::Allow => Ok(()),
            CancelVerdict::Veto => {
                tracing::warn!(order_id = %order.id, trader = %order.trader, "cancel vetoed by hook");
                Err(HookmatchError::CancelRejected(order.id))
            }
        }
    }

    pub fn after_cancel_order(&self, order: &Order, payload: &HookPayload) -> Result<()> {
        let method = HookMethod::AfterCancelOrder;
        if !self.capabilities.contains(method) {
            return Ok(());
        }
        unwrap_response(method, self.hook.after_cancel_order(order, payload))
    }

    /// Ask the hook about a cross and validate its answer.
    ///
    /// The adjusted price must stay positive and inside the band both
    /// orders agreed to. For a limit taker that is between the two prices.
    /// A market taker named no price, and any move away from the maker's
    /// price would breach the maker's limit, so the band is that price
    /// alone. A fee override must be consistent and no larger than the
    /// trade value at the adjusted price.
    pub fn before_match(&self, ctx: &MatchContext<'_>, payload: &HookPayload) -> Result<MatchTerms> {
        let method = HookMethod::BeforeMatch;
        if !self.capabilities.contains(method) {
            return Ok(MatchTerms::at(ctx.price));
        }
        let delta = unwrap_response(method, self.hook.before_match(ctx, payload))?;

        let adjusted = ctx.price.checked_add(delta.price_adjustment).ok_or_else(|| {
            reject(
                method,
                format!(
                    "price adjustment {} overflows for {} x {}",
                    delta.price_adjustment, ctx.taker.id, ctx.maker.id
                ),
            )
        })?;
        let (low, high) = price_band(ctx);
        if adjusted <= Decimal::ZERO || adjusted < low || adjusted > high {
            return Err(reject(
                method,
                format!(
                    "adjusted price {adjusted} outside [{low}, {high}] for {} x {}",
                    ctx.taker.id, ctx.maker.id
                ),
            ));
        }

        if let Some(fees) = delta.fee_override {
            if !fees.is_consistent() {
                return Err(reject(method, format!("inconsistent fee quote {fees:?}")));
            }
            let value = quote_value(adjusted, ctx.amount)?;
            if fees.taker_fee > value {
                return Err(reject(
                    method,
                    format!("taker fee {} exceeds trade value {value}", fees.taker_fee),
                ));
            }
        }
        Ok(MatchTerms {
            price: adjusted,
            fees: delta.fee_override.unwrap_or(FeeQuote::ZERO),
        })
    }

    pub fn after_match(&self, trade: &Trade, payload: &HookPayload) -> Result<()> {
        let method = HookMethod::AfterMatch;
        if !self.capabilities.contains(method) {
            return Ok(());
        }
        unwrap_response(method, self.hook.after_match(trade, payload))
    }
}

impl fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Inclusive price range a cross may execute at.
fn price_band(ctx: &MatchContext<'_>) -> (Decimal, Decimal) {
    let maker = ctx.price;
    match ctx.taker.order_type {
        OrderType::Limit => (maker.min(ctx.taker.price), maker.max(ctx.taker.price)),
        OrderType::Market => (maker, maker),
    }
}

fn unwrap_response<T>(method: HookMethod, result: HookResult<T>) -> Result<T> {
    let response: HookResponse<T> = result.map_err(|err| {
        tracing::warn!(method = %method, error = %err, "hook call failed");
        HookmatchError::HookCallFailed {
            method: method.name().to_string(),
            reason: err.to_string(),
        }
    })?;
    if response.selector != method.selector() {
        return Err(reject(
            method,
            format!(
                "capability token {} does not match {}",
                hex::encode(response.selector),
                method.selector_hex()
            ),
        ));
    }
    Ok(response.value)
}

fn reject(method: HookMethod, reason: String) -> HookmatchError {
    tracing::warn!(method = %method, %reason, "hook response rejected");
    HookmatchError::InvalidHookResponse {
        method: method.name().to_string(),
        reason,
    }
}
