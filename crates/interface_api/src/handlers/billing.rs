//! Billing-period handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillingMonth, BillingPeriodId, PatientId};

use crate::auth::Claims;
use crate::dto::billing::*;
use crate::error::ApiError;
use crate::AppState;

fn billing_month(year: i32, month: u32) -> Result<BillingMonth, ApiError> {
    BillingMonth::new(year, month).map_err(|e| ApiError::Validation(e.to_string()))
}

/// Processes a patient's charges for one month
pub async fn process_charges(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<ProcessChargesRequest>,
) -> Result<Json<BillingPeriodResponse>, ApiError> {
    request.validate()?;
    let therapist_id = claims.therapist_id()?;
    let month = billing_month(request.year, request.month)?;

    let period = state
        .billing
        .process_charges(
            therapist_id,
            PatientId::from(request.patient_id),
            month,
            &claims.sub,
        )
        .await?;
    Ok(Json(period.into()))
}

/// Retrieves a billing period with its session snapshots
pub async fn get_period(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillingPeriodResponse>, ApiError> {
    let period = state
        .billing
        .get_period(BillingPeriodId::from(id))
        .await?;
    Ok(Json(period.into()))
}

/// Voids a billing period
pub async fn void_period(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(request): Json<VoidPeriodRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    request.validate()?;
    state
        .billing
        .void_period(BillingPeriodId::from(id), &request.reason)
        .await?;
    Ok(Json(serde_json::json!({ "voided": true })))
}

/// A patient's outstanding balance
pub async fn outstanding(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OutstandingResponse>, ApiError> {
    let balance = state.billing.outstanding(PatientId::from(id)).await?;
    Ok(Json(balance.into()))
}

/// Per-patient billing overview for one month
pub async fn monthly_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<BillingSummaryResponse>>, ApiError> {
    query.validate()?;
    let therapist_id = claims.therapist_id()?;
    let month = billing_month(query.year, query.month)?;

    let summary = state.billing.monthly_summary(therapist_id, month).await?;
    Ok(Json(summary.into_iter().map(Into::into).collect()))
}
