//! HTTP client for the external CRM's JSON API.
//!
//! Records are upserted with `POST {base_url}/organizations` or
//! `POST {base_url}/contacts`; the CRM answers with `{"id": "..."}`.
//! Local primary keys never go on the wire.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{RecordKind, RemoteId};
use domain::RecordPayload;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{CrmClient, CrmError};

/// Connection settings for [`HttpCrmClient`].
#[derive(Debug, Clone)]
pub struct HttpCrmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Upper bound for a whole upsert request.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl HttpCrmConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Body of an upsert request.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum UpsertRequest<'a> {
    Organization {
        name: &'a str,
        email: Option<&'a str>,
        phone: Option<&'a str>,
        address: Option<&'a str>,
    },
    Contact {
        email: &'a str,
        first_name: &'a str,
        last_name: Option<&'a str>,
        phone: Option<&'a str>,
    },
}

impl<'a> From<&'a RecordPayload> for UpsertRequest<'a> {
    fn from(payload: &'a RecordPayload) -> Self {
        match payload {
            RecordPayload::Organization(org) => UpsertRequest::Organization {
                name: &org.name,
                email: org.email.as_ref().map(|e| e.as_str()),
                phone: org.phone.as_deref(),
                address: org.address.as_deref(),
            },
            RecordPayload::Contact(contact) => UpsertRequest::Contact {
                email: contact.email.as_str(),
                first_name: &contact.first_name,
                last_name: contact.last_name.as_deref(),
                phone: contact.phone.as_deref(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpsertResponse {
    id: String,
}

/// CRM client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCrmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCrmClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: HttpCrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn endpoint(&self, kind: RecordKind) -> String {
        let collection = match kind {
            RecordKind::Organization => "organizations",
            RecordKind::Contact => "contacts",
        };
        format!("{}/{collection}", self.base_url)
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    #[tracing::instrument(skip(self, payload), fields(kind = %payload.kind()))]
    async fn upsert(&self, payload: &RecordPayload) -> Result<RemoteId, CrmError> {
        let mut request = self
            .client
            .post(self.endpoint(payload.kind()))
            .json(&UpsertRequest::from(payload));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(classify_transport_error)?;
        let status = response.status();

        if status.is_success() {
            let body: UpsertResponse = response
                .json()
                .await
                .map_err(|e| CrmError::Permanent(format!("malformed CRM response: {e}")))?;
            if body.id.trim().is_empty() {
                return Err(CrmError::Permanent(
                    "CRM response carried an empty id".to_string(),
                ));
            }
            return Ok(RemoteId::new(body.id));
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(%status, error = %e, "could not read CRM error body");
                String::new()
            }
        };

        tracing::debug!(%status, "CRM upsert rejected");
        Err(classify_status(status, body, retry_after))
    }
}

/// Parses a `Retry-After` value given either as delay seconds or as an HTTP date.
fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn classify_transport_error(err: reqwest::Error) -> CrmError {
    if err.is_timeout() {
        return CrmError::Transient(format!("CRM request timed out: {err}"));
    }
    if err.is_connect() {
        return CrmError::Transient(format!("could not connect to CRM: {err}"));
    }
    CrmError::Transient(format!("CRM request failed: {err}"))
}

/// Maps a non-success CRM status onto the error taxonomy.
pub(crate) fn classify_status(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> CrmError {
    let message = if body.is_empty() {
        format!("status {status}")
    } else {
        format!("status {status}: {body}")
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CrmError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => CrmError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::REQUEST_TIMEOUT => CrmError::Transient(message),
        s if s.is_server_error() => CrmError::Transient(message),
        _ => CrmError::Permanent(message),
    }
}
