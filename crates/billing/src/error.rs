//! Billing error types.

use common::RecordId;
use domain::{ChargeError, ChargeId, Money};
use record_store::StoreError;
use thiserror::Error;

/// Errors that can occur during billing operations.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Charge not found: {0}")]
    ChargeNotFound(ChargeId),

    #[error("Organization not found: {0}")]
    OrganizationNotFound(RecordId),

    /// The recorded payment does not cover the charge exactly.
    #[error("Payment of {actual} does not match charge amount {expected}")]
    AmountMismatch { expected: Money, actual: Money },

    #[error("Charge error: {0}")]
    Charge(#[from] ChargeError),

    /// Payment processor error.
    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for billing results.
pub type Result<T> = std::result::Result<T, BillingError>;
