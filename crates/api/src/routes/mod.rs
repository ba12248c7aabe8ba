//! HTTP route handlers and shared state.

pub mod charges;
pub mod contacts;
pub mod health;
pub mod metrics;
pub mod organizations;
pub mod sync;

use std::sync::Arc;

use billing::{ChargeService, PaymentProcessor};
use common::RecordId;
use crm_sync::{CrmClient, DualWriteCoordinator};
use record_store::{ChargeStore, RecordStore};

use crate::error::ApiError;

/// CRM client chosen at startup (HTTP or in-memory).
pub type DynCrm = Arc<dyn CrmClient>;

/// Payment processor chosen at startup.
pub type DynProcessor = Arc<dyn PaymentProcessor>;

/// Storage backends the API can run on.
pub trait Store: RecordStore + ChargeStore + Clone + 'static {}

impl<T: RecordStore + ChargeStore + Clone + 'static> Store for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub coordinator: DualWriteCoordinator<S, DynCrm>,
    pub charges: ChargeService<S, DynProcessor>,
    pub store: S,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S, crm: DynCrm, processor: DynProcessor) -> Self {
        Self {
            coordinator: DualWriteCoordinator::new(store.clone(), crm),
            charges: ChargeService::new(store.clone(), processor),
            store,
        }
    }
}

pub(crate) fn parse_record_id(id: &str) -> Result<RecordId, ApiError> {
    id.parse::<i64>()
        .map(RecordId::new)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
