//! Outcome of a dual write.

use common::{RecordId, RecordKind, RemoteId};
use record_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crm::CrmError;

/// Coarse outcome tag of a dual write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Committed,
    RolledBack,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Committed => "committed",
            SyncStatus::RolledBack => "rolled_back",
            SyncStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a dual write left behind in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalEffect {
    /// The record is stored locally together with its CRM identifier.
    Persisted,
    /// Nothing was written.
    None,
    /// The local write happened and was deleted again.
    Undone,
    /// The local write may still be present; the stores have diverged.
    MayRemain,
}

/// A dual write that did not commit and was not cleanly rolled back.
#[derive(Debug, Error)]
pub enum SyncFailure {
    /// The local write failed; the CRM was never called.
    #[error("local write failed: {0}")]
    Store(#[source] StoreError),

    /// The CRM call failed and the compensating delete failed too.
    #[error(
        "{kind} {record_id} could not be synced ({crm_error}) and its compensating delete failed ({compensation_error})"
    )]
    Inconsistent {
        kind: RecordKind,
        record_id: RecordId,
        crm_error: CrmError,
        compensation_error: StoreError,
    },

    /// The CRM accepted the record but its identifier could not be stored locally.
    #[error("{kind} {record_id} was synced as {remote_id} but the remote id could not be stored: {error}")]
    RemoteIdNotRecorded {
        kind: RecordKind,
        record_id: RecordId,
        remote_id: RemoteId,
        error: StoreError,
    },
}

impl SyncFailure {
    /// True when the local store and the CRM may disagree and an operator
    /// has to reconcile them.
    pub fn is_inconsistent(&self) -> bool {
        !matches!(self, SyncFailure::Store(_))
    }

    pub fn local_effect(&self) -> LocalEffect {
        match self {
            SyncFailure::Store(_) => LocalEffect::None,
            SyncFailure::Inconsistent { .. } | SyncFailure::RemoteIdNotRecorded { .. } => {
                LocalEffect::MayRemain
            }
        }
    }
}

/// Result of [`DualWriteCoordinator::create_synced_record`].
///
/// [`DualWriteCoordinator::create_synced_record`]: crate::DualWriteCoordinator::create_synced_record
#[derive(Debug)]
pub enum SyncResult {
    /// Stored locally and mirrored to the CRM.
    Committed {
        kind: RecordKind,
        record_id: RecordId,
        remote_id: RemoteId,
    },

    /// The CRM refused the record and the local write was undone.
    RolledBack {
        kind: RecordKind,
        record_id: RecordId,
        error: CrmError,
    },

    Failed(SyncFailure),
}

impl SyncResult {
    pub fn status(&self) -> SyncStatus {
        match self {
            SyncResult::Committed { .. } => SyncStatus::Committed,
            SyncResult::RolledBack { .. } => SyncStatus::RolledBack,
            SyncResult::Failed(_) => SyncStatus::Failed,
        }
    }

    pub fn local_effect(&self) -> LocalEffect {
        match self {
            SyncResult::Committed { .. } => LocalEffect::Persisted,
            SyncResult::RolledBack { .. } => LocalEffect::Undone,
            SyncResult::Failed(failure) => failure.local_effect(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, SyncResult::Committed { .. })
    }

    /// The local record ID, if the local write happened at all.
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            SyncResult::Committed { record_id, .. } | SyncResult::RolledBack { record_id, .. } => {
                Some(*record_id)
            }
            SyncResult::Failed(SyncFailure::Inconsistent { record_id, .. })
            | SyncResult::Failed(SyncFailure::RemoteIdNotRecorded { record_id, .. }) => {
                Some(*record_id)
            }
            SyncResult::Failed(SyncFailure::Store(_)) => None,
        }
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        match self {
            SyncResult::Committed { remote_id, .. } => Some(remote_id),
            SyncResult::Failed(SyncFailure::RemoteIdNotRecorded { remote_id, .. }) => {
                Some(remote_id)
            }
            _ => None,
        }
    }

    /// The CRM error behind a rollback or an inconsistency.
    pub fn crm_error(&self) -> Option<&CrmError> {
        match self {
            SyncResult::RolledBack { error, .. } => Some(error),
            SyncResult::Failed(SyncFailure::Inconsistent { crm_error, .. }) => Some(crm_error),
            _ => None,
        }
    }
}
