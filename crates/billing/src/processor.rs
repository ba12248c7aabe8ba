//! Payment processor trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{Charge, ChargeId, PaymentLink};

use crate::error::BillingError;

/// Trait for the external payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a hosted payment link for a charge.
    async fn create_payment_link(&self, charge: &Charge) -> Result<PaymentLink, BillingError>;
}

#[async_trait]
impl<T: PaymentProcessor + ?Sized> PaymentProcessor for Arc<T> {
    async fn create_payment_link(&self, charge: &Charge) -> Result<PaymentLink, BillingError> {
        (**self).create_payment_link(charge).await
    }
}

#[derive(Debug, Default)]
struct InMemoryProcessorState {
    links: HashMap<String, ChargeId>,
    next_id: u32,
    fail_on_create_link: bool,
}

/// In-memory payment processor for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryProcessorState>>,
}

impl InMemoryPaymentProcessor {
    /// Creates a new in-memory payment processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the processor to fail on link creation.
    pub fn set_fail_on_create_link(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_link = fail;
    }

    /// Returns the number of issued links.
    pub fn link_count(&self) -> usize {
        self.state.read().unwrap().links.len()
    }

    /// Returns the charge a link was issued for.
    pub fn charge_for_link(&self, link_id: &str) -> Option<ChargeId> {
        self.state.read().unwrap().links.get(link_id).copied()
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_payment_link(&self, charge: &Charge) -> Result<PaymentLink, BillingError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create_link {
            return Err(BillingError::Processor(
                "Payment link creation declined".to_string(),
            ));
        }

        state.next_id += 1;
        let id = format!("PL-{:04}", state.next_id);
        state.links.insert(id.clone(), charge.id);

        Ok(PaymentLink {
            url: format!("https://pay.example.test/link/{id}"),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::RecordId;
    use domain::Money;

    fn charge() -> Charge {
        Charge::new(RecordId::new(1), Money::from_cents(5000), "Deposit").unwrap()
    }

    #[tokio::test]
    async fn test_sequential_links() {
        let processor = InMemoryPaymentProcessor::new();
        let charge = charge();

        let first = processor.create_payment_link(&charge).await.unwrap();
        let second = processor.create_payment_link(&charge).await.unwrap();

        assert_eq!(first.id, "PL-0001");
        assert_eq!(first.url, "https://pay.example.test/link/PL-0001");
        assert_eq!(second.id, "PL-0002");
        assert_eq!(processor.charge_for_link("PL-0001"), Some(charge.id));
    }

    #[tokio::test]
    async fn test_fail_on_create_link() {
        let processor = InMemoryPaymentProcessor::new();
        processor.set_fail_on_create_link(true);

        let result = processor.create_payment_link(&charge()).await;
        assert!(matches!(result, Err(BillingError::Processor(_))));
        assert_eq!(processor.link_count(), 0);
    }
}
