//! Charge service providing the billing API.

use common::RecordId;
use domain::{Charge, ChargeError, ChargeId, Money};
use record_store::{ChargeStore, RecordStore};

use crate::error::{BillingError, Result};
use crate::processor::PaymentProcessor;

/// Service for creating charges, issuing payment links and recording payments.
pub struct ChargeService<S, P>
where
    S: RecordStore + ChargeStore,
    P: PaymentProcessor,
{
    store: S,
    processor: P,
}

impl<S, P> ChargeService<S, P>
where
    S: RecordStore + ChargeStore,
    P: PaymentProcessor,
{
    pub fn new(store: S, processor: P) -> Self {
        Self { store, processor }
    }

    /// Creates a pending charge for an existing organization.
    #[tracing::instrument(skip(self))]
    pub async fn create_charge(
        &self,
        organization_id: RecordId,
        amount: Money,
        description: &str,
    ) -> Result<Charge> {
        if self.store.get_organization(organization_id).await?.is_none() {
            return Err(BillingError::OrganizationNotFound(organization_id));
        }

        let charge = Charge::new(organization_id, amount, description)?;
        self.store.insert_charge(&charge).await?;

        metrics::counter!("charges_created_total").increment(1);
        tracing::info!(charge_id = %charge.id, %amount, "charge created");
        Ok(charge)
    }

    /// Issues a payment link for a pending charge.
    #[tracing::instrument(skip(self))]
    pub async fn issue_payment_link(&self, charge_id: ChargeId) -> Result<Charge> {
        let mut charge = self.load(charge_id).await?;

        // Checked up front so the processor is not asked for a link we would discard.
        if !charge.state.can_quote() {
            return Err(ChargeError::InvalidStateTransition {
                current_state: charge.state,
                action: "issue a payment link",
            }
            .into());
        }

        let link = self.processor.create_payment_link(&charge).await?;
        charge.quote(link)?;
        self.store.update_charge(&charge).await?;

        metrics::counter!("payment_links_issued_total").increment(1);
        Ok(charge)
    }

    /// Records a payment for a quoted charge.
    #[tracing::instrument(skip(self))]
    pub async fn record_payment(
        &self,
        charge_id: ChargeId,
        payment_reference: &str,
        amount: Money,
    ) -> Result<Charge> {
        let mut charge = self.load(charge_id).await?;

        if amount != charge.amount {
            return Err(BillingError::AmountMismatch {
                expected: charge.amount,
                actual: amount,
            });
        }

        charge.mark_paid(payment_reference)?;
        self.store.update_charge(&charge).await?;

        metrics::counter!("payments_recorded_total").increment(1);
        tracing::info!(%charge_id, "payment recorded");
        Ok(charge)
    }

    pub async fn get_charge(&self, charge_id: ChargeId) -> Result<Option<Charge>> {
        Ok(self.store.get_charge(charge_id).await?)
    }

    /// Lists an organization's charges, oldest first.
    pub async fn list_charges(&self, organization_id: RecordId) -> Result<Vec<Charge>> {
        if self.store.get_organization(organization_id).await?.is_none() {
            return Err(BillingError::OrganizationNotFound(organization_id));
        }
        Ok(self.store.list_charges(organization_id).await?)
    }

    async fn load(&self, charge_id: ChargeId) -> Result<Charge> {
        self.store
            .get_charge(charge_id)
            .await?
            .ok_or(BillingError::ChargeNotFound(charge_id))
    }
}
