//! Charge endpoints: create, issue a payment link, record a payment.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Charge, ChargeId, Money};
use serde::{Deserialize, Serialize};

use super::{AppState, Store, parse_record_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct CreateChargeRequest {
    pub organization_id: i64,
    pub amount_cents: i64,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub payment_reference: String,
    pub amount_cents: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub id: String,
    pub organization_id: i64,
    pub amount_cents: i64,
    pub description: String,
    pub state: String,
    pub payment_link_id: Option<String>,
    pub payment_link_url: Option<String>,
    pub payment_reference: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Charge> for ChargeResponse {
    fn from(charge: Charge) -> Self {
        let (payment_link_id, payment_link_url) = match charge.payment_link {
            Some(link) => (Some(link.id), Some(link.url)),
            None => (None, None),
        };
        Self {
            id: charge.id.to_string(),
            organization_id: charge.organization_id.as_i64(),
            amount_cents: charge.amount.cents(),
            description: charge.description,
            state: charge.state.to_string(),
            payment_link_id,
            payment_link_url,
            payment_reference: charge.payment_reference,
            created_at: charge.created_at.to_rfc3339(),
            updated_at: charge.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /charges — create a pending charge for an organization.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateChargeRequest>,
) -> Result<(StatusCode, Json<ChargeResponse>), ApiError> {
    let charge = state
        .charges
        .create_charge(
            common::RecordId::new(req.organization_id),
            Money::from_cents(req.amount_cents),
            &req.description,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(charge.into())))
}

/// GET /charges/:id
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ChargeResponse>, ApiError> {
    let charge_id = parse_charge_id(&id)?;
    let charge = state
        .charges
        .get_charge(charge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Charge {id} not found")))?;

    Ok(Json(charge.into()))
}

/// GET /organizations/:id/charges
#[tracing::instrument(skip(state))]
pub async fn list_for_organization<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChargeResponse>>, ApiError> {
    let organization_id = parse_record_id(&id)?;
    let charges = state.charges.list_charges(organization_id).await?;
    Ok(Json(charges.into_iter().map(Into::into).collect()))
}

/// POST /charges/:id/payment-link — quote the charge with a hosted payment link.
#[tracing::instrument(skip(state))]
pub async fn issue_payment_link<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ChargeResponse>, ApiError> {
    let charge_id = parse_charge_id(&id)?;
    let charge = state.charges.issue_payment_link(charge_id).await?;
    Ok(Json(charge.into()))
}

/// POST /charges/:id/payments — mark a quoted charge as paid.
#[tracing::instrument(skip(state, req))]
pub async fn record_payment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<Json<ChargeResponse>, ApiError> {
    let charge_id = parse_charge_id(&id)?;
    let charge = state
        .charges
        .record_payment(
            charge_id,
            &req.payment_reference,
            Money::from_cents(req.amount_cents),
        )
        .await?;

    Ok(Json(charge.into()))
}

fn parse_charge_id(id: &str) -> Result<ChargeId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(ChargeId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid charge ID: {e}")))
}
