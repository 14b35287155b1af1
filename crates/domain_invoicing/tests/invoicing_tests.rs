//! Comprehensive tests for the invoice issuance gate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use core_kernel::{
    BillingMonth, BillingPeriodId, Cpf, DomainPort, Money, PortError, TherapistId,
};
use domain_invoicing::ports::mock::MockInvoicingPort;
use domain_invoicing::{
    DigitalCertificate, InvoiceProvider, InvoiceRequest, InvoiceService, InvoiceStatus,
    InvoicingError, MockInvoiceProvider, PeriodBillingView, ProviderInvoice,
};

fn paid_view(therapist: TherapistId) -> PeriodBillingView {
    PeriodBillingView {
        billing_period_id: BillingPeriodId::new_v7(),
        therapist_id: therapist,
        patient_name: "Maria Silva".to_string(),
        patient_document: Some(Cpf::parse("111.444.777-35").unwrap()),
        total_amount: Money::from_cents(54000),
        month: BillingMonth::new(2025, 6).unwrap(),
        is_paid: true,
    }
}

fn valid_certificate(therapist: TherapistId) -> DigitalCertificate {
    DigitalCertificate::new(
        therapist,
        "CN=ANA PEREIRA:12345678901",
        Utc::now() + chrono::Duration::days(90),
    )
}

async fn gate_with_paid_period() -> (InvoiceService, Arc<MockInvoicingPort>, BillingPeriodId) {
    let store = Arc::new(MockInvoicingPort::new());
    let therapist = TherapistId::new();
    let view = paid_view(therapist);
    let period_id = view.billing_period_id;
    store.upsert_period_view(view).await;
    store.add_certificate(valid_certificate(therapist)).await;

    let service = InvoiceService::new(store.clone(), Arc::new(MockInvoiceProvider::new()));
    (service, store, period_id)
}

/// Provider that always reports the upstream as unavailable
struct UnavailableProvider;

impl DomainPort for UnavailableProvider {}

#[async_trait]
impl InvoiceProvider for UnavailableProvider {
    async fn generate_invoice(
        &self,
        _request: &InvoiceRequest,
    ) -> Result<ProviderInvoice, PortError> {
        Err(PortError::unavailable("nfse-provider"))
    }

    async fn cancel_invoice(&self, _id: &str, _reason: &str) -> Result<(), PortError> {
        Err(PortError::unavailable("nfse-provider"))
    }
}

/// Provider that fails once, then behaves
struct RecoveringProvider {
    failed_once: AtomicBool,
    inner: MockInvoiceProvider,
}

impl RecoveringProvider {
    fn new() -> Self {
        Self {
            failed_once: AtomicBool::new(false),
            inner: MockInvoiceProvider::new(),
        }
    }
}

impl DomainPort for RecoveringProvider {}

#[async_trait]
impl InvoiceProvider for RecoveringProvider {
    async fn generate_invoice(
        &self,
        request: &InvoiceRequest,
    ) -> Result<ProviderInvoice, PortError> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(PortError::unavailable("nfse-provider"));
        }
        self.inner.generate_invoice(request).await
    }

    async fn cancel_invoice(&self, id: &str, reason: &str) -> Result<(), PortError> {
        self.inner.cancel_invoice(id, reason).await
    }
}

/// Provider that never answers inside any reasonable bound
struct HangingProvider;

impl DomainPort for HangingProvider {}

#[async_trait]
impl InvoiceProvider for HangingProvider {
    async fn generate_invoice(
        &self,
        _request: &InvoiceRequest,
    ) -> Result<ProviderInvoice, PortError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the gate must time out first")
    }

    async fn cancel_invoice(&self, _id: &str, _reason: &str) -> Result<(), PortError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("the gate must time out first")
    }
}

// ============================================================================
// Precondition Tests
// ============================================================================

mod precondition_tests {
    use super::*;

    #[tokio::test]
    async fn test_unpaid_period_is_rejected() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let mut view = paid_view(therapist);
        view.is_paid = false;
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store.add_certificate(valid_certificate(therapist)).await;

        let service = InvoiceService::new(store, Arc::new(MockInvoiceProvider::new()));
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::PeriodNotPaid));
    }

    #[tokio::test]
    async fn test_unknown_period_is_not_found() {
        let service = InvoiceService::new(
            Arc::new(MockInvoicingPort::new()),
            Arc::new(MockInvoiceProvider::new()),
        );
        let err = service
            .request_invoice(BillingPeriodId::new_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, InvoicingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_certificate_blocks_issuance() {
        let store = Arc::new(MockInvoicingPort::new());
        let view = paid_view(TherapistId::new());
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;

        let service = InvoiceService::new(store, Arc::new(MockInvoiceProvider::new()));
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::Certificate(_)));
    }

    #[tokio::test]
    async fn test_expired_certificate_blocks_issuance() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let view = paid_view(therapist);
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store
            .add_certificate(DigitalCertificate::new(
                therapist,
                "CN=EXPIRED",
                Utc::now() - chrono::Duration::days(1),
            ))
            .await;

        let service = InvoiceService::new(store, Arc::new(MockInvoiceProvider::new()));
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::Certificate(_)));
    }
}

// ============================================================================
// Issuance Tests
// ============================================================================

mod issuance_tests {
    use super::*;
    use domain_invoicing::InvoicingPort;

    #[tokio::test]
    async fn test_successful_issuance() {
        let (service, _store, period_id) = gate_with_paid_period().await;

        let invoice = service.request_invoice(period_id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        assert_eq!(invoice.billing_period_id, period_id);
        assert!(invoice.provider_invoice_id.is_some());
        assert!(invoice.issued_at.is_some());
    }

    #[tokio::test]
    async fn test_second_issuance_is_duplicate() {
        let (service, _store, period_id) = gate_with_paid_period().await;

        service.request_invoice(period_id).await.unwrap();
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::DuplicateInvoice));
    }

    #[tokio::test]
    async fn test_provider_failure_is_retryable_and_audited() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let view = paid_view(therapist);
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store.add_certificate(valid_certificate(therapist)).await;

        let service = InvoiceService::new(store.clone(), Arc::new(RecoveringProvider::new()));

        // First attempt fails upstream; an error record is persisted
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::Provider(_)));
        let records = service.invoices_for_period(period_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvoiceStatus::Error);
        assert!(records[0].error_message.is_some());

        // The error record does not block the retry
        let invoice = service.request_invoice(period_id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Issued);
        let records = service.invoices_for_period(period_id).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_timeout_is_a_failure_not_a_limbo() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let view = paid_view(therapist);
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store.add_certificate(valid_certificate(therapist)).await;

        let service = InvoiceService::new(store.clone(), Arc::new(HangingProvider))
            .with_provider_timeout(Duration::from_millis(50));

        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::Provider(_)));

        // The timeout is recorded as a failed attempt, nothing issued
        let records = service.invoices_for_period(period_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, InvoiceStatus::Error);
    }

    #[tokio::test]
    async fn test_unavailable_provider_keeps_slot_free() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let view = paid_view(therapist);
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store.add_certificate(valid_certificate(therapist)).await;

        let service = InvoiceService::new(store.clone(), Arc::new(UnavailableProvider));
        let err = service.request_invoice(period_id).await.unwrap_err();
        assert!(matches!(err, InvoicingError::Provider(_)));

        let issued = store.issued_invoice_for_period(period_id).await.unwrap();
        assert!(issued.is_none());
    }
}

// ============================================================================
// Cancellation Tests
// ============================================================================

mod cancellation_tests {
    use super::*;
    use domain_invoicing::InvoicingPort;

    #[tokio::test]
    async fn test_cancel_frees_period_for_reissuance() {
        let (service, _store, period_id) = gate_with_paid_period().await;

        let first = service.request_invoice(period_id).await.unwrap();
        service
            .cancel_invoice(first.id, "issued with wrong amount")
            .await
            .unwrap();

        let cancelled = service.get_invoice(first.id).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        // Fresh issuance now succeeds
        let second = service.request_invoice(period_id).await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.status, InvoiceStatus::Issued);
    }

    #[tokio::test]
    async fn test_cancel_requires_issued_status() {
        let (service, store, period_id) = gate_with_paid_period().await;

        let failed = domain_invoicing::Invoice::failed(period_id, "upstream rejected");
        store.insert_invoice(&failed).await.unwrap();

        let err = service
            .cancel_invoice(failed.id, "cannot cancel this")
            .await
            .unwrap_err();
        assert!(matches!(err, InvoicingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_failed_provider_cancellation_leaves_invoice_issued() {
        let store = Arc::new(MockInvoicingPort::new());
        let therapist = TherapistId::new();
        let view = paid_view(therapist);
        let period_id = view.billing_period_id;
        store.upsert_period_view(view).await;
        store.add_certificate(valid_certificate(therapist)).await;

        // Issue through the working provider first
        let issue_service =
            InvoiceService::new(store.clone(), Arc::new(MockInvoiceProvider::new()));
        let invoice = issue_service.request_invoice(period_id).await.unwrap();

        // Then try to cancel through a broken one
        let cancel_service = InvoiceService::new(store.clone(), Arc::new(UnavailableProvider));
        let err = cancel_service
            .cancel_invoice(invoice.id, "attempt")
            .await
            .unwrap_err();
        assert!(matches!(err, InvoicingError::Provider(_)));

        let unchanged = issue_service.get_invoice(invoice.id).await.unwrap();
        assert_eq!(unchanged.status, InvoiceStatus::Issued);
    }
}
