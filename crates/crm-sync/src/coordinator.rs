//! Dual-write coordinator for records mirrored to the CRM.

use common::{RecordId, RecordKind};
use domain::RecordPayload;
use record_store::RecordStore;

use crate::crm::{CrmClient, CrmError};
use crate::result::{SyncFailure, SyncResult, SyncStatus};

/// Writes records to the local store and mirrors them to the CRM.
///
/// The local insert runs first. If the CRM then fails, the insert is
/// compensated by deleting the row. Steps run sequentially within the
/// caller's task; there are no retries and no background work.
pub struct DualWriteCoordinator<S, C>
where
    S: RecordStore,
    C: CrmClient,
{
    store: S,
    crm: C,
}

impl<S, C> DualWriteCoordinator<S, C>
where
    S: RecordStore,
    C: CrmClient,
{
    pub fn new(store: S, crm: C) -> Self {
        Self { store, crm }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn crm(&self) -> &C {
        &self.crm
    }

    /// Creates a record locally and mirrors it to the CRM.
    ///
    /// Never returns a record that exists locally without a confirmed remote
    /// ID, except when a failure is reported as inconsistent.
    #[tracing::instrument(skip(self, payload), fields(kind = %payload.kind(), label = payload.label()))]
    pub async fn create_synced_record(&self, payload: &RecordPayload) -> SyncResult {
        let kind = payload.kind();
        metrics::counter!("sync_attempts_total", "kind" => kind.as_str()).increment(1);
        let start = std::time::Instant::now();

        let result = self.dual_write(kind, payload).await;

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("sync_duration_seconds", "kind" => kind.as_str()).record(duration);
        match &result {
            SyncResult::Committed { .. } => {
                metrics::counter!("sync_committed_total", "kind" => kind.as_str()).increment(1);
            }
            SyncResult::RolledBack { .. } => {
                metrics::counter!("sync_rolled_back_total", "kind" => kind.as_str()).increment(1);
            }
            SyncResult::Failed(failure) => {
                metrics::counter!("sync_failed_total", "kind" => kind.as_str()).increment(1);
                if failure.is_inconsistent() {
                    metrics::counter!("sync_inconsistencies_total", "kind" => kind.as_str())
                        .increment(1);
                }
            }
        }

        result
    }

    async fn dual_write(&self, kind: RecordKind, payload: &RecordPayload) -> SyncResult {
        // 1. Local write; nothing to undo if it fails
        let record_id = match self.store.create(payload).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "local write failed, CRM not called");
                return SyncResult::Failed(SyncFailure::Store(e));
            }
        };

        // 2. Mirror to the CRM
        let remote_id = match self.crm.upsert(payload).await {
            Ok(remote_id) => remote_id,
            Err(crm_error) => return self.compensate(kind, record_id, crm_error).await,
        };

        // 3. Link the local record to its remote counterpart
        if let Err(error) = self.store.set_remote_id(kind, record_id, &remote_id).await {
            tracing::error!(
                %record_id,
                %remote_id,
                error = %error,
                "record synced but remote id not stored; stores diverged"
            );
            return SyncResult::Failed(SyncFailure::RemoteIdNotRecorded {
                kind,
                record_id,
                remote_id,
                error,
            });
        }

        tracing::info!(%record_id, %remote_id, status = %SyncStatus::Committed, "record synced");
        SyncResult::Committed {
            kind,
            record_id,
            remote_id,
        }
    }

    /// Deletes the just-created local record after a CRM failure.
    async fn compensate(
        &self,
        kind: RecordKind,
        record_id: RecordId,
        crm_error: CrmError,
    ) -> SyncResult {
        match self.store.delete(kind, record_id).await {
            Ok(()) => {
                tracing::warn!(
                    %record_id,
                    error = %crm_error,
                    error_class = %crm_error.class(),
                    "CRM sync failed, local write rolled back"
                );
                SyncResult::RolledBack {
                    kind,
                    record_id,
                    error: crm_error,
                }
            }
            Err(compensation_error) => {
                tracing::error!(
                    %record_id,
                    crm_error = %crm_error,
                    compensation_error = %compensation_error,
                    "CRM sync failed and compensating delete failed; stores diverged"
                );
                SyncResult::Failed(SyncFailure::Inconsistent {
                    kind,
                    record_id,
                    crm_error,
                    compensation_error,
                })
            }
        }
    }
}
