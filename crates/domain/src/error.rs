//! Domain error types.

use thiserror::Error;

use crate::charge::ChargeError;

/// Errors that can occur while building or mutating domain records.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A field failed validation.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// An error occurred in the charge lifecycle.
    #[error("Charge error: {0}")]
    Charge(#[from] ChargeError),
}
