//! API error handling
//!
//! Maps every domain error onto the HTTP vocabulary: conflicts (lost races,
//! duplicate periods/invoices, settlement-order violations) are 409s,
//! malformed input is 422, upstream provider failures are 502 and marked
//! retryable for the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_billing::BillingError;
use domain_invoicing::InvoicingError;
use domain_patient::PatientError;
use domain_reconciliation::ReconciliationError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream provider error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, retryable, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", None, msg.clone()),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", None, msg.clone())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                None,
                "Unauthorized".to_string(),
            ),
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, "conflict", Some(false), msg.clone())
            }
            ApiError::Upstream(msg) => (
                StatusCode::BAD_GATEWAY,
                "provider_error",
                Some(true),
                msg.clone(),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                None,
                msg.clone(),
            ),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                None,
                msg.clone(),
            ),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            retryable,
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(msg) => ApiError::Validation(msg),
            BillingError::NotFound(msg) => ApiError::NotFound(msg),
            BillingError::AlreadyProcessed { .. }
            | BillingError::PeriodHasPayment
            | BillingError::ChronologyViolation { .. }
            | BillingError::ConcurrencyConflict(_) => ApiError::Conflict(err.to_string()),
            BillingError::Money(e) => ApiError::Internal(e.to_string()),
            BillingError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<InvoicingError> for ApiError {
    fn from(err: InvoicingError) -> Self {
        match err {
            InvoicingError::Validation(msg) => ApiError::Validation(msg),
            InvoicingError::NotFound(msg) => ApiError::NotFound(msg),
            InvoicingError::PeriodNotPaid
            | InvoicingError::Certificate(_)
            | InvoicingError::DuplicateInvoice
            | InvoicingError::ConcurrencyConflict(_) => ApiError::Conflict(err.to_string()),
            InvoicingError::Provider(msg) => ApiError::Upstream(msg),
            InvoicingError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ReconciliationError> for ApiError {
    fn from(err: ReconciliationError) -> Self {
        match err {
            ReconciliationError::Validation(msg) => ApiError::Validation(msg),
            ReconciliationError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound(msg) => ApiError::NotFound(msg),
            PatientError::Validation(msg) => ApiError::Validation(msg),
            PatientError::Port(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err.to_string())
    }
}
