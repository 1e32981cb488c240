//! # hookmatch-hooks
//!
//! **Lifecycle hook protocol for HookMatch books.**
//!
//! A book is bound to exactly one extension module at construction. The
//! module implements [`BookHook`] and is consulted at seven call-points:
//!
//! | call-point | may return |
//! |------------|-----------|
//! | `before_place_order` | an [`OrderDelta`] |
//! | `after_place_order` | nothing |
//! | `on_order_added_to_book` | nothing |
//! | `before_cancel_order` | a [`CancelVerdict`] |
//! | `after_cancel_order` | nothing |
//! | `before_match` | a [`MatchDelta`] |
//! | `after_match` | nothing |
//!
//! Every response echoes the call-point's capability token
//! ([`HookMethod::selector`]). The [`HookDispatcher`] applies the deltas
//! itself and rejects responses carrying the wrong token or out-of-bounds
//! deltas, which aborts the whole book operation.

pub mod delta;
pub mod dispatcher;
pub mod hook;
pub mod selector;

pub use delta::{CancelVerdict, HookPayload, MatchContext, MatchDelta, MatchTerms, OrderDelta};
pub use dispatcher::HookDispatcher;
pub use hook::{BookHook, HookError, HookResult, NoOpHook};
pub use selector::{HookCapabilities, HookMethod, HookResponse, Selector};
