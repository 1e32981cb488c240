//! The hook trait and the no-op module.

use hookmatch_types::{Order, Trade};
use thiserror::Error;

use crate::{
    CancelVerdict, HookCapabilities, HookMethod, HookPayload, HookResponse, MatchContext,
    MatchDelta, OrderDelta,
};

/// Failure reported by a hook module itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub type HookResult<T> = std::result::Result<HookResponse<T>, HookError>;

/// An extension module bound to one book.
///
/// Every method has a pass-through default, so a module only overrides the
/// call-points it cares about. Modules are shared behind `Arc` and take
/// `&self`; any state they keep needs interior mutability.
pub trait BookHook: Send + Sync {
    /// Call-points the dispatcher should invoke. The rest are skipped.
    fn capabilities(&self) -> HookCapabilities {
        HookCapabilities::all()
    }

    fn before_place_order(&self, order: &Order, payload: &HookPayload) -> HookResult<OrderDelta> {
        let _ = (order, payload);
        Ok(HookResponse::new(HookMethod::BeforePlaceOrder, OrderDelta::NONE))
    }

    fn after_place_order(&self, order: &Order, payload: &HookPayload) -> HookResult<()> {
        let _ = (order, payload);
        Ok(HookResponse::ack(HookMethod::AfterPlaceOrder))
    }

    fn on_order_added_to_book(&self, order: &Order, payload: &HookPayload) -> HookResult<()> {
        let _ = (order, payload);
        Ok(HookResponse::ack(HookMethod::OnOrderAddedToBook))
    }

    fn before_cancel_order(&self, order: &Order, payload: &HookPayload) -> HookResult<CancelVerdict> {
        let _ = (order, payload);
        Ok(HookResponse::new(
            HookMethod::BeforeCancelOrder,
            CancelVerdict::Allow,
        ))
    }

    fn after_cancel_order(&self, order: &Order, payload: &HookPayload) -> HookResult<()> {
        let _ = (order, payload);
        Ok(HookResponse::ack(HookMethod::AfterCancelOrder))
    }

    fn before_match(&self, ctx: &MatchContext<'_>, payload: &HookPayload) -> HookResult<MatchDelta> {
        let _ = (ctx, payload);
        Ok(HookResponse::new(HookMethod::BeforeMatch, MatchDelta::NONE))
    }

    fn after_match(&self, trade: &Trade, payload: &HookPayload) -> HookResult<()> {
        let _ = (trade, payload);
        Ok(HookResponse::ack(HookMethod::AfterMatch))
    }
}

/// Module for books that want no interception.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHook;

impl BookHook for NoOpHook {
    fn capabilities(&self) -> HookCapabilities {
        HookCapabilities::none()
    }
}
