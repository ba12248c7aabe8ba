//! Charges raised against organizations and their payment lifecycle.

mod model;
mod state;

pub use model::{Charge, ChargeId, PaymentLink};
pub use state::ChargeState;

use thiserror::Error;

/// Errors that can occur during charge operations.
#[derive(Debug, Error)]
pub enum ChargeError {
    /// Charge amounts must be positive.
    #[error("Invalid amount: {amount} cents (must be greater than 0)")]
    InvalidAmount { amount: i64 },

    /// Charge is not in the expected state.
    #[error("Invalid state transition: cannot {action} from {current_state} state")]
    InvalidStateTransition {
        current_state: ChargeState,
        action: &'static str,
    },

    /// A paid charge needs the processor's payment reference.
    #[error("Payment reference is required")]
    PaymentReferenceRequired,
}
