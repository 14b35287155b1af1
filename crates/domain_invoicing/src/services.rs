//! Invoice issuance service
//!
//! The gate in front of the external provider. Its own state transition only
//! commits after the provider call resolves: a success persists the issued
//! invoice, a failure (including timeout) persists an error-status record and
//! surfaces a retryable provider error. Nothing is ever left half-applied.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use core_kernel::{BillingPeriodId, InvoiceId};

use crate::error::InvoicingError;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ports::{InvoicingPort, PeriodBillingView};
use crate::provider::{InvoiceProvider, InvoiceRequest};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Service enforcing one-issued-invoice-per-paid-period semantics
pub struct InvoiceService {
    store: Arc<dyn InvoicingPort>,
    provider: Arc<dyn InvoiceProvider>,
    provider_timeout: Duration,
}

impl InvoiceService {
    pub fn new(store: Arc<dyn InvoicingPort>, provider: Arc<dyn InvoiceProvider>) -> Self {
        Self {
            store,
            provider,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Overrides the bound on provider calls
    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    /// Requests a tax document for a paid billing period
    ///
    /// # Errors
    ///
    /// - `PeriodNotPaid` when the period is not settled
    /// - `Certificate` when no valid digital certificate is on file
    /// - `DuplicateInvoice` when an issued invoice already exists,
    ///   including when this call loses a concurrent-issuance race
    /// - `Provider` when the upstream call fails or times out; an
    ///   error-status invoice is persisted for audit and a retry is allowed
    pub async fn request_invoice(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Invoice, InvoicingError> {
        let view = self.store.period_view(period_id).await?;
        if !view.is_paid {
            return Err(InvoicingError::PeriodNotPaid);
        }

        match self.store.certificate_for(view.therapist_id).await? {
            None => {
                return Err(InvoicingError::Certificate(
                    "no digital certificate on file".to_string(),
                ))
            }
            Some(certificate) if !certificate.is_valid() => {
                return Err(InvoicingError::Certificate(format!(
                    "digital certificate expired at {}",
                    certificate.expires_at
                )))
            }
            Some(_) => {}
        }

        if self
            .store
            .issued_invoice_for_period(period_id)
            .await?
            .is_some()
        {
            return Err(InvoicingError::DuplicateInvoice);
        }

        let request = build_request(&view);
        let outcome = timeout(
            self.provider_timeout,
            self.provider.generate_invoice(&request),
        )
        .await;

        let provider_invoice = match outcome {
            Err(_elapsed) => {
                let message = format!(
                    "provider call timed out after {}ms",
                    self.provider_timeout.as_millis()
                );
                self.persist_failure(period_id, &message).await;
                return Err(InvoicingError::Provider(message));
            }
            Ok(Err(err)) => {
                let message = err.to_string();
                self.persist_failure(period_id, &message).await;
                return Err(InvoicingError::Provider(message));
            }
            Ok(Ok(provider_invoice)) => provider_invoice,
        };

        let invoice = Invoice::issued(period_id, provider_invoice.provider_invoice_id);
        match self.store.insert_invoice(&invoice).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => return Err(InvoicingError::DuplicateInvoice),
            Err(err) => return Err(err.into()),
        }

        info!(
            invoice = %invoice.id,
            period = %period_id,
            provider_id = invoice.provider_invoice_id.as_deref().unwrap_or_default(),
            "invoice issued"
        );
        Ok(invoice)
    }

    /// Cancels an issued invoice at the provider, freeing the period for a
    /// fresh issuance
    ///
    /// # Errors
    ///
    /// - `Validation` when the invoice is not in `issued` status
    /// - `Provider` when the upstream cancellation fails; the invoice stays
    ///   issued and the call may be retried
    pub async fn cancel_invoice(
        &self,
        invoice_id: InvoiceId,
        reason: &str,
    ) -> Result<(), InvoicingError> {
        let mut invoice = self.store.find_invoice(invoice_id).await?;
        if invoice.status != InvoiceStatus::Issued {
            return Err(InvoicingError::Validation(format!(
                "only issued invoices can be cancelled (status is {})",
                invoice.status.as_str()
            )));
        }
        let provider_id = invoice.provider_invoice_id.clone().ok_or_else(|| {
            InvoicingError::Validation("issued invoice has no provider document id".to_string())
        })?;

        let outcome = timeout(
            self.provider_timeout,
            self.provider.cancel_invoice(&provider_id, reason),
        )
        .await;
        match outcome {
            Err(_elapsed) => {
                return Err(InvoicingError::Provider(format!(
                    "provider cancellation timed out after {}ms",
                    self.provider_timeout.as_millis()
                )))
            }
            Ok(Err(err)) => return Err(InvoicingError::Provider(err.to_string())),
            Ok(Ok(())) => {}
        }

        invoice.cancel()?;
        self.store.update_invoice(&invoice).await?;
        info!(invoice = %invoice_id, reason, "invoice cancelled");
        Ok(())
    }

    /// Retrieves an invoice
    pub async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, InvoicingError> {
        Ok(self.store.find_invoice(invoice_id).await?)
    }

    /// Every issuance record of a period, newest attempt last
    pub async fn invoices_for_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Vec<Invoice>, InvoicingError> {
        Ok(self.store.invoices_for_period(period_id).await?)
    }

    /// Persists the audit record of a failed attempt; never masks the
    /// provider error being returned to the caller
    async fn persist_failure(&self, period_id: BillingPeriodId, message: &str) {
        let record = Invoice::failed(period_id, message);
        if let Err(err) = self.store.insert_invoice(&record).await {
            warn!(%err, period = %period_id, "could not persist failed-invoice record");
        }
    }
}

fn build_request(view: &PeriodBillingView) -> InvoiceRequest {
    InvoiceRequest {
        billing_period_id: view.billing_period_id,
        therapist_id: view.therapist_id,
        patient_name: view.patient_name.clone(),
        patient_document: view.patient_document.clone(),
        amount: view.total_amount,
        service_description: format!("Sessoes de psicoterapia {}", view.month),
    }
}
