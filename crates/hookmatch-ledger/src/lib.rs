//! # hookmatch-ledger
//!
//! **Custody ledger for HookMatch books.**
//!
//! Tracks per-(trader, asset) balances split into `available` and `locked`:
//!
//! 1. `deposit` credits available
//! 2. `lock` reserves funds for a live order (available -> locked)
//! 3. `settle` pays a counterparty out of locked funds
//! 4. `unlock` releases an order's leftover escrow (locked -> available)
//!
//! Balances are stored as packed records, so a credit that would overflow
//! the record fails instead of truncating. Every mutation can be staged in
//! a [`LedgerTxn`] and committed atomically, and [`SupplyAudit`] checks that
//! no operation creates or destroys funds.

pub mod ledger;
pub mod supply;
pub mod txn;

use std::sync::{Arc, Mutex};

pub use ledger::BalanceLedger;
pub use supply::SupplyAudit;
pub use txn::LedgerTxn;

/// A ledger shared between several books.
pub type SharedLedger = Arc<Mutex<BalanceLedger>>;
