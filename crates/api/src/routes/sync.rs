//! HTTP rendering of a dual-write outcome.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::RecordKind;
use crm_sync::{ErrorClass, LocalEffect, SyncFailure, SyncResult, SyncStatus};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    pub kind: RecordKind,
    pub id: Option<i64>,
    pub remote_id: Option<String>,
    pub local_effect: LocalEffect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
    pub inconsistent: bool,
}

impl SyncResponse {
    pub fn new(kind: RecordKind, result: &SyncResult) -> Self {
        let error = match result {
            SyncResult::Committed { .. } => None,
            SyncResult::RolledBack { error, .. } => Some(error.to_string()),
            SyncResult::Failed(failure) => Some(failure.to_string()),
        };
        let inconsistent = match result {
            SyncResult::Failed(failure) => failure.is_inconsistent(),
            _ => false,
        };

        Self {
            status: result.status(),
            kind,
            id: result.record_id().map(|id| id.as_i64()),
            remote_id: result.remote_id().map(|id| id.to_string()),
            local_effect: result.local_effect(),
            error,
            error_class: result.crm_error().map(|e| e.class()),
            inconsistent,
        }
    }
}

/// HTTP status for a dual-write outcome.
///
/// A rollback caused by the CRM rejecting the data is a conflict; any other
/// rollback means the upstream was unavailable. Every failed outcome is a
/// server error; the body's `local_effect` tells whether anything was written.
pub fn status_code(result: &SyncResult) -> StatusCode {
    match result {
        SyncResult::Committed { .. } => StatusCode::CREATED,
        SyncResult::RolledBack { error, .. } => match error.class() {
            ErrorClass::Permanent => StatusCode::CONFLICT,
            _ => StatusCode::BAD_GATEWAY,
        },
        SyncResult::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn into_response(kind: RecordKind, result: &SyncResult) -> Response {
    let status = status_code(result);
    metrics::counter!("http_sync_responses_total", "status" => status.as_str().to_string())
        .increment(1);
    if let SyncResult::Failed(failure) = result
        && failure.is_inconsistent()
    {
        tracing::error!(%status, %kind, error = %failure, "record left inconsistent between store and CRM");
    }
    (status, Json(SyncResponse::new(kind, result))).into_response()
}
