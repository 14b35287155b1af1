//! Invoicing DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BillingPeriodId, InvoiceId};
use domain_invoicing::{Invoice, InvoiceStatus};

/// Request to issue a tax document for a paid period
#[derive(Debug, Deserialize)]
pub struct RequestInvoiceRequest {
    pub billing_period_id: Uuid,
}

/// Request to cancel an issued invoice
#[derive(Debug, Deserialize, Validate)]
pub struct CancelInvoiceRequest {
    #[validate(length(min = 3, message = "reason must explain the cancellation"))]
    pub reason: String,
}

/// Invoice representation
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub billing_period_id: BillingPeriodId,
    pub provider_invoice_id: Option<String>,
    pub status: InvoiceStatus,
    pub issued_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            billing_period_id: invoice.billing_period_id,
            provider_invoice_id: invoice.provider_invoice_id,
            status: invoice.status,
            issued_at: invoice.issued_at,
            error_message: invoice.error_message,
            cancelled_at: invoice.cancelled_at,
        }
    }
}
