//! Charge state machine.

use serde::{Deserialize, Serialize};

/// The state of a charge in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Quoted ──► Paid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChargeState {
    /// Charge has been created, no payment link yet.
    #[default]
    Pending,

    /// A payment link has been issued to the payer.
    Quoted,

    /// Payment has been recorded (terminal state).
    Paid,
}

impl ChargeState {
    /// Returns true if a payment link can be issued in this state.
    pub fn can_quote(&self) -> bool {
        matches!(self, ChargeState::Pending)
    }

    /// Returns true if a payment can be recorded in this state.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, ChargeState::Quoted)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChargeState::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Pending => "pending",
            ChargeState::Quoted => "quoted",
            ChargeState::Paid => "paid",
        }
    }
}

impl std::fmt::Display for ChargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChargeState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ChargeState::Pending),
            "quoted" => Ok(ChargeState::Quoted),
            "paid" => Ok(ChargeState::Paid),
            other => Err(format!("unknown charge state: {other}")),
        }
    }
}
