//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use billing::BillingError;
use domain::{ChargeError, DomainError};
use record_store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Validation error from the domain layer.
    Domain(DomainError),
    /// Charge lifecycle error.
    Billing(BillingError),
    /// Record store error.
    Store(StoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Billing(err) => billing_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Charge(charge_err) => charge_error_status(charge_err, err.to_string()),
    }
}

fn charge_error_status(err: &ChargeError, message: String) -> (StatusCode, String) {
    match err {
        ChargeError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, message),
        ChargeError::InvalidAmount { .. } | ChargeError::PaymentReferenceRequired => {
            (StatusCode::BAD_REQUEST, message)
        }
    }
}

fn billing_error_to_response(err: BillingError) -> (StatusCode, String) {
    match &err {
        BillingError::ChargeNotFound(_) | BillingError::OrganizationNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        BillingError::AmountMismatch { .. } => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        BillingError::Charge(charge_err) => charge_error_status(charge_err, err.to_string()),
        BillingError::Processor(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        BillingError::Store(store_err) => store_status(store_err, err.to_string()),
    }
}

fn store_error_to_response(err: StoreError) -> (StatusCode, String) {
    let message = err.to_string();
    store_status(&err, message)
}

fn store_status(err: &StoreError, message: String) -> (StatusCode, String) {
    match err {
        StoreError::ConstraintViolation { .. } => (StatusCode::CONFLICT, message),
        StoreError::NotFound { .. } => (StatusCode::NOT_FOUND, message),
        StoreError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, message),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, message),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        ApiError::Billing(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
