//! HTTP API for organizations, contacts and charges.
//!
//! Organizations and contacts are created through the dual-write
//! coordinator, so a `201` means the record exists both locally and in the
//! CRM. Structured logging goes through `tracing`, metrics are exported in
//! Prometheus format.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, DynCrm, DynProcessor, Store};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/organizations",
            post(routes::organizations::create::<S>).get(routes::organizations::list::<S>),
        )
        .route("/organizations/{id}", get(routes::organizations::get::<S>))
        .route(
            "/organizations/{id}/charges",
            get(routes::charges::list_for_organization::<S>),
        )
        .route(
            "/contacts",
            post(routes::contacts::create::<S>).get(routes::contacts::list::<S>),
        )
        .route("/contacts/{id}", get(routes::contacts::get::<S>))
        .route("/charges", post(routes::charges::create::<S>))
        .route("/charges/{id}", get(routes::charges::get::<S>))
        .route(
            "/charges/{id}/payment-link",
            post(routes::charges::issue_payment_link::<S>),
        )
        .route(
            "/charges/{id}/payments",
            post(routes::charges::record_payment::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store, a CRM client and a payment processor.
pub fn create_default_state<S: Store>(
    store: S,
    crm: DynCrm,
    processor: DynProcessor,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, crm, processor))
}
