//! External CRM client trait, classified errors and implementations.

pub mod http;
pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::RemoteId;
use domain::RecordPayload;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::{HttpCrmClient, HttpCrmConfig};
pub use memory::InMemoryCrmClient;

/// Retry category of a CRM failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Network trouble or a server-side error; retrying the whole operation is safe.
    Transient,
    /// The CRM rejected the data; do not retry with the same payload.
    Permanent,
    /// Credentials were rejected; needs operator attention.
    Auth,
    /// The CRM is throttling us; needs operator attention or a later retry.
    RateLimit,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Permanent => "permanent",
            ErrorClass::Auth => "auth",
            ErrorClass::RateLimit => "rate_limit",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified CRM failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrmError {
    #[error("CRM unavailable: {0}")]
    Transient(String),

    #[error("CRM rejected the record: {0}")]
    Permanent(String),

    #[error("CRM authentication failed: {0}")]
    Auth(String),

    #[error("CRM rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },
}

impl CrmError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CrmError::Transient(_) => ErrorClass::Transient,
            CrmError::Permanent(_) => ErrorClass::Permanent,
            CrmError::Auth(_) => ErrorClass::Auth,
            CrmError::RateLimited { .. } => ErrorClass::RateLimit,
        }
    }

    /// Only transient failures may be retried without operator involvement.
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Client for the external CRM.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Creates or updates the remote record for `payload` and returns its
    /// remote identifier.
    async fn upsert(&self, payload: &RecordPayload) -> Result<RemoteId, CrmError>;
}

#[async_trait]
impl<T: CrmClient + ?Sized> CrmClient for Arc<T> {
    async fn upsert(&self, payload: &RecordPayload) -> Result<RemoteId, CrmError> {
        (**self).upsert(payload).await
    }
}
