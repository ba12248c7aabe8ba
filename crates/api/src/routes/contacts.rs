//! Contact endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Response;
use common::RecordId;
use domain::{Contact, Email, NewContact, RecordPayload};
use serde::{Deserialize, Serialize};

use super::{AppState, Store, parse_record_id, sync};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub organization_id: Option<i64>,
}

impl CreateContactRequest {
    fn into_payload(self) -> Result<RecordPayload, ApiError> {
        let email = Email::parse(&self.email)?;
        let mut new = NewContact::new(email, &self.first_name)?
            .with_last_name(self.last_name)
            .with_phone(self.phone);
        if let Some(org_id) = self.organization_id {
            new = new.for_organization(RecordId::new(org_id));
        }
        Ok(new.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub full_name: String,
    pub phone: Option<String>,
    pub organization_id: Option<i64>,
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id.as_i64(),
            full_name: contact.full_name(),
            email: contact.email.as_str().to_string(),
            first_name: contact.first_name,
            last_name: contact.last_name,
            phone: contact.phone,
            organization_id: contact.organization_id.map(|id| id.as_i64()),
            remote_id: contact.remote_id.map(|r| r.to_string()),
            created_at: contact.created_at.to_rfc3339(),
            updated_at: contact.updated_at.to_rfc3339(),
        }
    }
}

/// POST /contacts — create a contact and mirror it to the CRM.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateContactRequest>,
) -> Result<Response, ApiError> {
    let payload = req.into_payload()?;
    let result = state.coordinator.create_synced_record(&payload).await;
    Ok(sync::into_response(payload.kind(), &result))
}

/// GET /contacts/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ContactResponse>, ApiError> {
    let record_id = parse_record_id(&id)?;
    let contact = state
        .store
        .get_contact(record_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contact {id} not found")))?;

    Ok(Json(contact.into()))
}

/// GET /contacts
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let contacts = state.store.list_contacts().await?;
    Ok(Json(contacts.into_iter().map(Into::into).collect()))
}
