//! Payment handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BankTransactionId, BillingPeriodId, Money, PaymentId};
use domain_billing::RecordPaymentRequest as DomainPaymentRequest;

use crate::auth::Claims;
use crate::dto::billing::{BillingPeriodResponse, PaymentResponse, RecordPaymentRequest};
use crate::error::ApiError;
use crate::AppState;

/// Records a payment against a billing period
pub async fn record_payment(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(request): Json<RecordPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    request.validate()?;

    let payment = state
        .payments
        .record_payment(DomainPaymentRequest {
            billing_period_id: BillingPeriodId::from(request.billing_period_id),
            amount: Money::from_cents(request.amount_cents),
            method: request.method,
            payment_date: request.payment_date,
            reference_number: request.reference_number,
            bank_transaction_id: request.bank_transaction_id.map(BankTransactionId::from),
        })
        .await?;
    Ok(Json(payment.into()))
}

/// Cancels a payment; returns the updated billing period so clients can
/// re-render outstanding state
pub async fn cancel_payment(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<BillingPeriodResponse>, ApiError> {
    let period = state
        .payments
        .cancel_payment(PaymentId::from(id))
        .await?;
    Ok(Json(period.into()))
}
