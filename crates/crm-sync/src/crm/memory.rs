//! In-memory CRM client for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::RemoteId;
use domain::RecordPayload;

use super::{CrmClient, CrmError};

#[derive(Debug, Default)]
struct InMemoryCrmState {
    records: HashMap<RemoteId, RecordPayload>,
    next_id: u32,
    fail_with: Option<CrmError>,
    calls: usize,
}

/// In-memory CRM client for testing.
///
/// Upserts are keyed by the record's natural key (organization name or
/// contact e-mail), so repeating an upsert returns the same remote ID.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCrmClient {
    state: Arc<RwLock<InMemoryCrmState>>,
}

impl InMemoryCrmClient {
    /// Creates a new in-memory CRM client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures every subsequent upsert to fail with `error`.
    pub fn set_fail_with(&self, error: Option<CrmError>) {
        self.state.write().unwrap().fail_with = error;
    }

    /// Returns how many times `upsert` has been called, failed calls included.
    pub fn call_count(&self) -> usize {
        self.state.read().unwrap().calls
    }

    /// Returns the number of records held by the CRM.
    pub fn record_count(&self) -> usize {
        self.state.read().unwrap().records.len()
    }

    pub fn get(&self, remote_id: &RemoteId) -> Option<RecordPayload> {
        self.state.read().unwrap().records.get(remote_id).cloned()
    }
}

#[async_trait]
impl CrmClient for InMemoryCrmClient {
    async fn upsert(&self, payload: &RecordPayload) -> Result<RemoteId, CrmError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if let Some(error) = &state.fail_with {
            return Err(error.clone());
        }

        let existing = state
            .records
            .iter()
            .find(|(_, stored)| stored.kind() == payload.kind() && stored.label() == payload.label())
            .map(|(id, _)| id.clone());

        let remote_id = match existing {
            Some(id) => id,
            None => {
                state.next_id += 1;
                RemoteId::new(format!("CRM-{:04}", state.next_id))
            }
        };
        state.records.insert(remote_id.clone(), payload.clone());

        Ok(remote_id)
    }
}
