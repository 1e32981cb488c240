//! Error types for the HookMatch engine.
//!
//! All errors use the `HM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors (validation, lookup, authorization)
//! - 2xx: Balance errors
//! - 3xx: Record codec errors
//! - 4xx: Hook protocol errors
//! - 5xx: Matching / invariant errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OrderId, OrderStatus, UserId};

/// Central error enum for all HookMatch operations.
#[derive(Debug, Error)]
pub enum HookmatchError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// The order does not exist, or is already terminal.
    #[error("HM_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Limit price missing, non-positive, or present on a market order.
    #[error("HM_ERR_101: Invalid price: {reason}")]
    InvalidPrice { reason: String },

    /// Amount non-positive or otherwise unusable.
    #[error("HM_ERR_102: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// An order with this ID already exists.
    #[error("HM_ERR_103: Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// Only the owning trader may cancel an order.
    #[error("HM_ERR_104: Unauthorized: {caller} does not own {order_id}")]
    Unauthorized { order_id: OrderId, caller: UserId },

    /// The book's hook vetoed the cancellation.
    #[error("HM_ERR_105: Cancellation of {0} rejected by hook")]
    CancelRejected(OrderId),

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("HM_ERR_200: Insufficient available balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Decimal, available: Decimal },

    /// Not enough locked balance to unlock or settle.
    #[error("HM_ERR_201: Insufficient locked balance: need {needed}, have {locked}")]
    InsufficientLocked { needed: Decimal, locked: Decimal },

    // =================================================================
    // Codec Errors (3xx)
    // =================================================================
    /// A value does not fit its declared bit width.
    #[error("HM_ERR_300: Value {value} overflows field {field} ({width} bits)")]
    FieldOverflow {
        field: &'static str,
        width: u32,
        value: String,
    },

    /// A decimal value cannot be represented at the field's fixed-point scale.
    #[error("HM_ERR_301: Value {value} loses precision in field {field}")]
    PrecisionLoss { field: &'static str, value: String },

    /// A record layout is malformed (overlap, straddling, wasted words).
    #[error("HM_ERR_302: Invalid record layout: {reason}")]
    InvalidLayout { reason: String },

    /// Packed bits do not decode to a valid value.
    #[error("HM_ERR_303: Corrupt record field {field}: {reason}")]
    CorruptRecord { field: &'static str, reason: String },

    // =================================================================
    // Hook Protocol Errors (4xx)
    // =================================================================
    /// The hook echoed the wrong capability token or returned an
    /// out-of-bounds delta.
    #[error("HM_ERR_400: Invalid hook response from {method}: {reason}")]
    InvalidHookResponse { method: String, reason: String },

    /// The hook itself reported a failure.
    #[error("HM_ERR_401: Hook call {method} failed: {reason}")]
    HookCallFailed { method: String, reason: String },

    // =================================================================
    // Matching / Invariant Errors (5xx)
    // =================================================================
    /// Attempted an illegal order status change.
    #[error("HM_ERR_500: Illegal status transition for {order_id}: {from} -> {to}")]
    InvalidStatusTransition {
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Supply conservation invariant violated.
    #[error("HM_ERR_501: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("HM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("HM_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config, missing fields, etc.).
    #[error("HM_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl HookmatchError {
    /// Expected outcomes the caller may act on without treating the book as
    /// misconfigured.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CancelRejected(_))
    }

    /// Errors caused by a misbehaving extension module.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidHookResponse { .. } | Self::HookCallFailed { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, HookmatchError>;

impl From<serde_json::Error> for HookmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = HookmatchError::OrderNotFound(OrderId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("HM_ERR_100"), "Got: {msg}");
        assert!(msg.contains("order:7"));
    }

    #[test]
    fn insufficient_balance_display() {
        let err = HookmatchError::InsufficientBalance {
            needed: Decimal::new(100, 0),
            available: Decimal::new(50, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("HM_ERR_200"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn classification() {
        assert!(HookmatchError::CancelRejected(OrderId(1)).is_recoverable());
        assert!(!HookmatchError::OrderNotFound(OrderId(1)).is_recoverable());
        assert!(
            HookmatchError::InvalidHookResponse {
                method: "beforeMatch".into(),
                reason: "token".into(),
            }
            .is_protocol_error()
        );
    }

    #[test]
    fn all_errors_have_hm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(HookmatchError::CancelRejected(OrderId(1))),
            Box::new(HookmatchError::InsufficientLocked {
                needed: Decimal::ONE,
                locked: Decimal::ZERO,
            }),
            Box::new(HookmatchError::FieldOverflow {
                field: "price",
                width: 96,
                value: "1".into(),
            }),
            Box::new(HookmatchError::HookCallFailed {
                method: "afterMatch".into(),
                reason: "boom".into(),
            }),
            Box::new(HookmatchError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("HM_ERR_"),
                "Error missing HM_ERR_ prefix: {msg}"
            );
        }
    }
}
