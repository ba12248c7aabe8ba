//! Organization endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use domain::{Email, NewOrganization, Organization, RecordPayload};
use serde::{Deserialize, Serialize};

use super::{AppState, Store, parse_record_id, sync};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CreateOrganizationRequest {
    fn into_payload(self) -> Result<RecordPayload, ApiError> {
        let mut new = NewOrganization::new(&self.name)?
            .with_phone(self.phone)
            .with_address(self.address);
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            new = new.with_email(Email::parse(email)?);
        }
        Ok(new.into())
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id.as_i64(),
            name: org.name,
            email: org.email.map(|e| e.as_str().to_string()),
            phone: org.phone,
            address: org.address,
            remote_id: org.remote_id.map(|r| r.to_string()),
            created_at: org.created_at.to_rfc3339(),
            updated_at: org.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /organizations — create an organization and mirror it to the CRM.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Response, ApiError> {
    let payload = req.into_payload()?;
    let result = state.coordinator.create_synced_record(&payload).await;
    Ok(sync::into_response(payload.kind(), &result))
}

/// GET /organizations/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let record_id = parse_record_id(&id)?;
    let org = state
        .store
        .get_organization(record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Organization {id} not found")))?;

    Ok(Json(org.into()))
}

/// GET /organizations
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrganizationResponse>>, ApiError> {
    let orgs = state.store.list_organizations().await?;
    Ok(Json(orgs.into_iter().map(Into::into).collect()))
}
