//! # hookmatch-matchcore
//!
//! **Continuous price-time matching engine for HookMatch books.**
//!
//! A [`MatchingEngine`] owns one market's book and processes placements
//! and cancellations one at a time:
//!
//! - **Price-time priority**: best price first, FIFO within a price
//! - **Hook-mediated**: every operation consults the book's
//!   [`BookHook`](hookmatch_hooks::BookHook) at its lifecycle call-points
//! - **Transactional**: custody moves, order updates and events of one
//!   operation commit together or not at all
//! - **Replayable**: trade ids and the [`compute_trade_root`] digest depend
//!   only on the sequence of operations

pub mod determinism;
pub mod engine;
pub mod events;
pub mod orderbook;
mod plan;
pub mod price_level;
pub mod request;
pub mod store;

pub use determinism::{compute_trade_root, trade_root_hex, verify_trade_root};
pub use engine::MatchingEngine;
pub use events::{EventLog, EventSink, VecSink};
pub use orderbook::OrderBook;
pub use price_level::PriceLevel;
pub use request::{BookDepth, DepthLevel, OrderRequest, PlaceOutcome};
pub use store::OrderStore;
