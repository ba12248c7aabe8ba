use chrono::{DateTime, Utc};
use common::RecordId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ChargeError, ChargeState};
use crate::value_objects::Money;

/// Unique identifier for a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChargeId(Uuid);

impl ChargeId {
    /// Creates a new random charge ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ChargeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChargeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ChargeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A hosted payment page issued by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLink {
    /// The processor's identifier for the link.
    pub id: String,
    pub url: String,
}

/// An amount owed by an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub organization_id: RecordId,
    pub amount: Money,
    pub description: String,
    pub state: ChargeState,
    pub payment_link: Option<PaymentLink>,
    /// Set iff the charge is paid.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    /// Creates a pending charge for an organization.
    pub fn new(
        organization_id: RecordId,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<Self, ChargeError> {
        if !amount.is_positive() {
            return Err(ChargeError::InvalidAmount {
                amount: amount.cents(),
            });
        }

        let now = Utc::now();
        Ok(Self {
            id: ChargeId::new(),
            organization_id,
            amount,
            description: description.into().trim().to_string(),
            state: ChargeState::Pending,
            payment_link: None,
            payment_reference: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Attaches a payment link, moving the charge from pending to quoted.
    pub fn quote(&mut self, link: PaymentLink) -> Result<(), ChargeError> {
        if !self.state.can_quote() {
            return Err(ChargeError::InvalidStateTransition {
                current_state: self.state,
                action: "issue a payment link",
            });
        }

        self.payment_link = Some(link);
        self.state = ChargeState::Quoted;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records a successful payment, moving the charge from quoted to paid.
    pub fn mark_paid(&mut self, payment_reference: &str) -> Result<(), ChargeError> {
        if !self.state.can_mark_paid() {
            return Err(ChargeError::InvalidStateTransition {
                current_state: self.state,
                action: "record a payment",
            });
        }

        let reference = payment_reference.trim();
        if reference.is_empty() {
            return Err(ChargeError::PaymentReferenceRequired);
        }

        self.payment_reference = Some(reference.to_string());
        self.state = ChargeState::Paid;
        self.updated_at = Utc::now();
        Ok(())
    }
}
