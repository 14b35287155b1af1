//! Invoice entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingPeriodId, InvoiceId};

use crate::error::InvoicingError;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Accepted by the provider; the one-per-period slot is taken
    Issued,
    /// Submitted, provider outcome pending
    Processing,
    /// Provider rejected or failed; a later retry is allowed
    Error,
    /// Cancelled at the provider; frees the slot for re-issuance
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Processing => "processing",
            InvoiceStatus::Error => "error",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// A tax-document record tied to one billing period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// The billed period this document covers
    pub billing_period_id: BillingPeriodId,
    /// Identifier assigned by the external provider
    pub provider_invoice_id: Option<String>,
    /// Current status
    pub status: InvoiceStatus,
    /// When the provider accepted the document
    pub issued_at: Option<DateTime<Utc>>,
    /// Provider failure detail, when status is `error`
    pub error_message: Option<String>,
    /// When the document was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// An invoice accepted by the provider
    pub fn issued(
        billing_period_id: BillingPeriodId,
        provider_invoice_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: InvoiceId::new_v7(),
            billing_period_id,
            provider_invoice_id: Some(provider_invoice_id.into()),
            status: InvoiceStatus::Issued,
            issued_at: Some(now),
            error_message: None,
            cancelled_at: None,
            created_at: now,
        }
    }

    /// A failed issuance attempt, kept for audit; never blocks a retry
    pub fn failed(billing_period_id: BillingPeriodId, error_message: impl Into<String>) -> Self {
        Self {
            id: InvoiceId::new_v7(),
            billing_period_id,
            provider_invoice_id: None,
            status: InvoiceStatus::Error,
            issued_at: None,
            error_message: Some(error_message.into()),
            cancelled_at: None,
            created_at: Utc::now(),
        }
    }

    /// Marks the invoice cancelled; only legal while `issued`
    pub fn cancel(&mut self) -> Result<(), InvoicingError> {
        match self.status {
            InvoiceStatus::Issued => {
                self.status = InvoiceStatus::Cancelled;
                self.cancelled_at = Some(Utc::now());
                Ok(())
            }
            other => Err(InvoicingError::Validation(format!(
                "only issued invoices can be cancelled (status is {})",
                other.as_str()
            ))),
        }
    }
}
