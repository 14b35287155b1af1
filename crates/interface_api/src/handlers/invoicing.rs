//! Invoicing handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillingPeriodId, InvoiceId};

use crate::auth::Claims;
use crate::dto::invoicing::{CancelInvoiceRequest, InvoiceResponse, RequestInvoiceRequest};
use crate::error::ApiError;
use crate::AppState;

/// Requests a tax document for a paid billing period
pub async fn request_invoice(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(request): Json<RequestInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state
        .invoicing
        .request_invoice(BillingPeriodId::from(request.billing_period_id))
        .await?;
    Ok(Json(invoice.into()))
}

/// Retrieves an invoice
pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.invoicing.get_invoice(InvoiceId::from(id)).await?;
    Ok(Json(invoice.into()))
}

/// Cancels an issued invoice
pub async fn cancel_invoice(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelInvoiceRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    request.validate()?;
    state
        .invoicing
        .cancel_invoice(InvoiceId::from(id), &request.reason)
        .await?;
    Ok(Json(serde_json::json!({ "cancelled": true })))
}
