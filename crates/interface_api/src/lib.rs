//! HTTP API Layer
//!
//! This crate provides the REST API for the practice billing engine using
//! Axum.
//!
//! # Architecture
//!
//! - **Handlers**: request handlers per domain, fully wired to the services
//! - **Middleware**: JWT authentication and request audit logging
//! - **DTOs**: request/response data transfer objects with validation
//! - **Error Handling**: consistent mapping of domain errors to HTTP statuses
//!
//! The state carries the domain services behind their port traits, so the
//! same router runs over PostgreSQL adapters in production and over the
//! in-memory mocks in tests.

pub mod config;
pub mod error;
pub mod auth;
pub mod middleware;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_billing::{BillingPeriodService, PaymentService};
use domain_invoicing::InvoiceService;
use domain_patient::PatientPort;
use domain_reconciliation::ReconciliationService;

use crate::config::ApiConfig;
use crate::handlers::{billing, health, invoicing, patients, payments, reconciliation};
use crate::middleware::{audit_log, require_auth};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub billing: Arc<BillingPeriodService>,
    pub payments: Arc<PaymentService>,
    pub reconciliation: Arc<ReconciliationService>,
    pub invoicing: Arc<InvoiceService>,
    pub patients: Arc<dyn PatientPort>,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health::health_check));

    // Billing-period routes
    let billing_routes = Router::new()
        .route("/", post(billing::process_charges))
        .route("/summary", get(billing::monthly_summary))
        .route("/:id", get(billing::get_period))
        .route("/:id/void", post(billing::void_period));

    // Payment routes
    let payment_routes = Router::new()
        .route("/", post(payments::record_payment))
        .route("/:id", delete(payments::cancel_payment));

    // Patient routes
    let patient_routes = Router::new()
        .route("/", post(patients::create_patient).get(patients::list_patients))
        .route("/:id", get(patients::get_patient))
        .route("/:id/outstanding", get(billing::outstanding));

    // Reconciliation routes
    let reconciliation_routes =
        Router::new().route("/matches", get(reconciliation::find_matches));

    // Invoice routes
    let invoice_routes = Router::new()
        .route("/", post(invoicing::request_invoice))
        .route("/:id", get(invoicing::get_invoice))
        .route("/:id/cancel", post(invoicing::cancel_invoice));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/billing-periods", billing_routes)
        .nest("/payments", payment_routes)
        .nest("/patients", patient_routes)
        .nest("/reconciliation", reconciliation_routes)
        .nest("/invoices", invoice_routes)
        .layer(axum_middleware::from_fn(audit_log))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
