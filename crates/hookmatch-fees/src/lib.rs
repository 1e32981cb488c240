//! # hookmatch-fees
//!
//! **Tiered fee and rebate engine for HookMatch books.**
//!
//! A trader's rolling quote volume selects a [`FeeTier`]. For each cross the
//! taker pays the tier's taker rate (less any referral discount); when the
//! maker is a flagged market maker part of that fee is passed on as a
//! rebate and the rest is retained by the book's fee pool.
//!
//! [`FeeTierEngine`] is a shared service: several books hold the same
//! `Arc` so volumes aggregate across pairs. [`FeeHook`] plugs it into a
//! book through the hook protocol.

pub mod engine;
pub mod hook;
pub mod schedule;
pub mod volume;

pub use engine::FeeTierEngine;
pub use hook::FeeHook;
pub use schedule::{FeeSchedule, FeeTier};
pub use volume::VolumeTracker;
