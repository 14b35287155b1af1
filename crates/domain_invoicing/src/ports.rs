//! Invoicing domain ports
//!
//! `InvoicingPort` persists invoices and exposes the read model the gate
//! needs: the billing-period view (paid?, who, how much) and the therapist's
//! certificate. The one-issued-invoice-per-period rule is enforced both here
//! (insert conflicts) and by the relational schema's partial unique index.

use async_trait::async_trait;

use core_kernel::{
    BillingMonth, BillingPeriodId, Cpf, DomainPort, InvoiceId, Money, PortError, TherapistId,
};

use crate::certificate::DigitalCertificate;
use crate::invoice::Invoice;

/// What the gate needs to know about a billing period
#[derive(Debug, Clone)]
pub struct PeriodBillingView {
    pub billing_period_id: BillingPeriodId,
    pub therapist_id: TherapistId,
    pub patient_name: String,
    pub patient_document: Option<Cpf>,
    pub total_amount: Money,
    pub month: BillingMonth,
    pub is_paid: bool,
}

/// Storage port for invoices, certificates, and the period read model
#[async_trait]
pub trait InvoicingPort: DomainPort {
    /// Retrieves an invoice by ID
    async fn find_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    /// The currently-issued invoice for a period, if any
    async fn issued_invoice_for_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Option<Invoice>, PortError>;

    /// Every invoice record of a period (issued, error, cancelled)
    async fn invoices_for_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<Vec<Invoice>, PortError>;

    /// Persists a new invoice
    ///
    /// Inserting an `issued` invoice fails with `Conflict` when another
    /// issued invoice already exists for the same period, including when
    /// this call loses a concurrent-issuance race.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    /// Updates an existing invoice
    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), PortError>;

    /// The gate's view of a billing period
    async fn period_view(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<PeriodBillingView, PortError>;

    /// The therapist's registered certificate, if any
    async fn certificate_for(
        &self,
        therapist_id: TherapistId,
    ) -> Result<Option<DigitalCertificate>, PortError>;
}

/// In-memory mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::invoice::InvoiceStatus;

    /// In-memory invoicing store
    #[derive(Debug, Default)]
    pub struct MockInvoicingPort {
        invoices: Arc<RwLock<HashMap<InvoiceId, Invoice>>>,
        views: Arc<RwLock<HashMap<BillingPeriodId, PeriodBillingView>>>,
        certificates: Arc<RwLock<HashMap<TherapistId, DigitalCertificate>>>,
    }

    impl MockInvoicingPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers or replaces the view of a billing period
        pub async fn upsert_period_view(&self, view: PeriodBillingView) {
            self.views
                .write()
                .await
                .insert(view.billing_period_id, view);
        }

        /// Flips the paid flag of a registered period view
        pub async fn set_period_paid(&self, period_id: BillingPeriodId, paid: bool) {
            if let Some(view) = self.views.write().await.get_mut(&period_id) {
                view.is_paid = paid;
            }
        }

        /// Registers a therapist certificate
        pub async fn add_certificate(&self, certificate: DigitalCertificate) {
            self.certificates
                .write()
                .await
                .insert(certificate.therapist_id, certificate);
        }
    }

    impl DomainPort for MockInvoicingPort {}

    #[async_trait]
    impl InvoicingPort for MockInvoicingPort {
        async fn find_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.invoices
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Invoice", id))
        }

        async fn issued_invoice_for_period(
            &self,
            period_id: BillingPeriodId,
        ) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .invoices
                .read()
                .await
                .values()
                .find(|i| i.billing_period_id == period_id && i.status == InvoiceStatus::Issued)
                .cloned())
        }

        async fn invoices_for_period(
            &self,
            period_id: BillingPeriodId,
        ) -> Result<Vec<Invoice>, PortError> {
            let invoices = self.invoices.read().await;
            let mut result: Vec<_> = invoices
                .values()
                .filter(|i| i.billing_period_id == period_id)
                .cloned()
                .collect();
            result.sort_by_key(|i| i.created_at);
            Ok(result)
        }

        async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            let mut invoices = self.invoices.write().await;
            if invoice.status == InvoiceStatus::Issued {
                let taken = invoices.values().any(|i| {
                    i.billing_period_id == invoice.billing_period_id
                        && i.status == InvoiceStatus::Issued
                });
                if taken {
                    return Err(PortError::conflict(format!(
                        "an issued invoice already exists for period {}",
                        invoice.billing_period_id
                    )));
                }
            }
            invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn update_invoice(&self, invoice: &Invoice) -> Result<(), PortError> {
            let mut invoices = self.invoices.write().await;
            if !invoices.contains_key(&invoice.id) {
                return Err(PortError::not_found("Invoice", invoice.id));
            }
            invoices.insert(invoice.id, invoice.clone());
            Ok(())
        }

        async fn period_view(
            &self,
            period_id: BillingPeriodId,
        ) -> Result<PeriodBillingView, PortError> {
            self.views
                .read()
                .await
                .get(&period_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BillingPeriod", period_id))
        }

        async fn certificate_for(
            &self,
            therapist_id: TherapistId,
        ) -> Result<Option<DigitalCertificate>, PortError> {
            Ok(self.certificates.read().await.get(&therapist_id).cloned())
        }
    }
}
