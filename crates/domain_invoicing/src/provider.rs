//! Invoice provider capability
//!
//! The external tax-document provider is consumed exclusively through this
//! trait. The mock provider is a first-class interchangeable implementation,
//! not a test shim: a practice evaluating the system can run with it and
//! switch to a real municipal provider by swapping the adapter at startup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingPeriodId, Cpf, DomainPort, Money, PortError, TherapistId};

/// Everything the provider needs to generate a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub billing_period_id: BillingPeriodId,
    pub therapist_id: TherapistId,
    pub patient_name: String,
    pub patient_document: Option<Cpf>,
    pub amount: Money,
    pub service_description: String,
}

/// The provider's answer to a successful generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInvoice {
    /// Identifier of the document at the provider
    pub provider_invoice_id: String,
    /// Verification code printed on the document, when the provider has one
    pub verification_code: Option<String>,
    /// Provider-side issuance instant
    pub issued_at: DateTime<Utc>,
}

/// External tax-document provider
#[async_trait]
pub trait InvoiceProvider: DomainPort {
    /// Generates a document; errors are classified through `PortError`
    /// (`is_transient` decides whether the caller may retry as-is)
    async fn generate_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<ProviderInvoice, PortError>;

    /// Cancels a previously issued document
    async fn cancel_invoice(
        &self,
        provider_invoice_id: &str,
        reason: &str,
    ) -> Result<(), PortError>;
}

/// Provider implementation that simulates successful issuance
///
/// Assigns sequential `MOCK-` document ids and never fails.
#[derive(Debug, Default)]
pub struct MockInvoiceProvider {
    sequence: std::sync::atomic::AtomicU64,
}

impl MockInvoiceProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for MockInvoiceProvider {}

#[async_trait]
impl InvoiceProvider for MockInvoiceProvider {
    async fn generate_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<ProviderInvoice, PortError> {
        let seq = self
            .sequence
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        tracing::debug!(period = %request.billing_period_id, seq, "mock invoice issued");
        Ok(ProviderInvoice {
            provider_invoice_id: format!("MOCK-{:06}", seq),
            verification_code: None,
            issued_at: Utc::now(),
        })
    }

    async fn cancel_invoice(
        &self,
        provider_invoice_id: &str,
        reason: &str,
    ) -> Result<(), PortError> {
        tracing::debug!(provider_invoice_id, reason, "mock invoice cancelled");
        Ok(())
    }
}
