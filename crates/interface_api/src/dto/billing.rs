//! Billing DTOs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillingPeriodId, PatientId, PaymentId};
use domain_billing::{
    BillingPeriod, BillingSummary, OutstandingBalance, Payment, PaymentMethod, PeriodStatus,
};

/// Request to process a patient's charges for one month
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessChargesRequest {
    pub patient_id: Uuid,
    #[validate(range(min = 1970, max = 2200))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
}

/// Request to void a billing period
#[derive(Debug, Deserialize, Validate)]
pub struct VoidPeriodRequest {
    #[validate(length(min = 3, message = "reason must explain the void"))]
    pub reason: String,
}

/// Request to record a payment
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    pub billing_period_id: Uuid,
    #[validate(range(min = 1))]
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference_number: Option<String>,
    pub bank_transaction_id: Option<Uuid>,
}

/// One billed session inside a period response
#[derive(Debug, Serialize)]
pub struct SessionSnapshotResponse {
    pub external_event_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub patient_name: String,
}

/// Billing period representation
#[derive(Debug, Serialize)]
pub struct BillingPeriodResponse {
    pub id: BillingPeriodId,
    pub patient_id: PatientId,
    pub year: i32,
    pub month: u32,
    pub session_count: u32,
    pub total_amount_cents: i64,
    pub billing_reference: String,
    pub status: PeriodStatus,
    pub sessions: Vec<SessionSnapshotResponse>,
    pub processed_at: DateTime<Utc>,
    pub processed_by: String,
}

impl From<BillingPeriod> for BillingPeriodResponse {
    fn from(period: BillingPeriod) -> Self {
        Self {
            id: period.id,
            patient_id: period.patient_id,
            year: period.month.year(),
            month: period.month.month(),
            session_count: period.session_count,
            total_amount_cents: period.total_amount.cents(),
            billing_reference: period.billing_reference,
            status: period.status,
            sessions: period
                .snapshots
                .into_iter()
                .map(|s| SessionSnapshotResponse {
                    external_event_id: s.external_event_id,
                    date: s.date,
                    time: s.time,
                    patient_name: s.patient_name,
                })
                .collect(),
            processed_at: period.processed_at,
            processed_by: period.processed_by,
        }
    }
}

/// Payment representation
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: PaymentId,
    pub billing_period_id: BillingPeriodId,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference_number: Option<String>,
    pub bank_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            billing_period_id: payment.billing_period_id,
            amount_cents: payment.amount.cents(),
            method: payment.method,
            payment_date: payment.payment_date,
            reference_number: payment.reference_number,
            bank_transaction_id: payment.bank_transaction_id.map(|t| *t.as_uuid()),
            created_at: payment.created_at,
        }
    }
}

/// A patient's outstanding balance
#[derive(Debug, Serialize)]
pub struct OutstandingResponse {
    pub has_outstanding: bool,
    pub amount_cents: i64,
    pub oldest_unpaid_year: Option<i32>,
    pub oldest_unpaid_month: Option<u32>,
}

impl From<OutstandingBalance> for OutstandingResponse {
    fn from(balance: OutstandingBalance) -> Self {
        Self {
            has_outstanding: balance.has_outstanding,
            amount_cents: balance.amount.cents(),
            oldest_unpaid_year: balance.oldest_unpaid.map(|m| m.year()),
            oldest_unpaid_month: balance.oldest_unpaid.map(|m| m.month()),
        }
    }
}

/// Query for the monthly summary
#[derive(Debug, Deserialize, Validate)]
pub struct SummaryQuery {
    #[validate(range(min = 1970, max = 2200))]
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: u32,
}

/// One row of the monthly billing overview
#[derive(Debug, Serialize)]
pub struct BillingSummaryResponse {
    pub billing_period_id: BillingPeriodId,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub session_count: u32,
    pub total_amount_cents: i64,
    pub status: PeriodStatus,
    pub billing_reference: String,
}

impl From<BillingSummary> for BillingSummaryResponse {
    fn from(summary: BillingSummary) -> Self {
        Self {
            billing_period_id: summary.billing_period_id,
            patient_id: summary.patient_id,
            patient_name: summary.patient_name,
            session_count: summary.session_count,
            total_amount_cents: summary.total_amount.cents(),
            status: summary.status,
            billing_reference: summary.billing_reference,
        }
    }
}
