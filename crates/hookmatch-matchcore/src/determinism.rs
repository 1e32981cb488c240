//! Trade-history digest.
//!
//! Replaying the same operations against a fresh book produces the same
//! trades in the same order. The `trade_root` is a hash over that sequence
//! so read models can reconcile without comparing full payloads.

use hookmatch_types::Trade;
use sha2::{Digest, Sha256};

/// Compute the trade root hash over a set of trades.
///
/// Depends on trade ids, fill sequence, both orders and traders, price,
/// amount, quote amount and fees, in order. Timestamps are excluded.
#[must_use]
pub fn compute_trade_root(trades: &[Trade]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"hookmatch:trade_root:v1:");
    hasher.update((trades.len() as u64).to_le_bytes());

    for trade in trades {
        hasher.update(trade.id.0.as_bytes());
        hasher.update(trade.fill_sequence.to_le_bytes());
        hasher.update(trade.taker_order_id.0.to_le_bytes());
        hasher.update(trade.maker_order_id.0.to_le_bytes());
        hasher.update(trade.taker.0.as_bytes());
        hasher.update(trade.maker.0.as_bytes());
        hasher.update(trade.price.normalize().to_string().as_bytes());
        hasher.update(trade.amount.normalize().to_string().as_bytes());
        hasher.update(trade.quote_amount.normalize().to_string().as_bytes());
        hasher.update(trade.fees.taker_fee.normalize().to_string().as_bytes());
        hasher.update(trade.fees.maker_rebate.normalize().to_string().as_bytes());
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Verify that a given trade root matches the expected hash.
#[must_use]
pub fn verify_trade_root(trades: &[Trade], expected_root: &[u8; 32]) -> bool {
    compute_trade_root(trades) == *expected_root
}

/// Hex form of [`compute_trade_root`], for logs and read-model checkpoints.
#[must_use]
pub fn trade_root_hex(trades: &[Trade]) -> String {
    hex::encode(compute_trade_root(trades))
}
