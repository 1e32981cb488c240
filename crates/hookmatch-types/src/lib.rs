//! # hookmatch-types
//!
//! Shared types, errors, and configuration for the **HookMatch** order book.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`UserId`], [`TradeId`], [`MarketPair`]
//! - **Order model**: [`Order`], [`OrderSide`], [`OrderType`], [`OrderStatus`]
//! - **Trade model**: [`Trade`], [`FeeQuote`]
//! - **Balance model**: [`BalanceEntry`], [`Asset`]
//! - **Events**: [`BookEvent`], [`SequencedEvent`], [`RemovalReason`]
//! - **Configuration**: [`BookConfig`]
//! - **Errors**: [`HookmatchError`] with `HM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use hookmatch_types::{Order, OrderSide, Trade, FeeQuote, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use trade::*;

// Constants are accessed via `hookmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
