//! End-to-end scenarios across all domain services, wired over the
//! in-memory adapters

use std::sync::Arc;

use chrono::{NaiveTime, Utc};

use core_kernel::TherapistId;
use domain_billing::ports::mock::{
    MockBillingStore, MockSessionSource, RecordingNotificationSink,
};
use domain_billing::{
    BillingPeriodService, BillingPort, PaymentService, PeriodStatus, RecordPaymentRequest,
    SessionEvent, SessionStatus,
};
use domain_invoicing::ports::mock::MockInvoicingPort;
use domain_invoicing::{
    DigitalCertificate, InvoiceService, InvoiceStatus, InvoicingError, MockInvoiceProvider,
    PeriodBillingView,
};
use domain_patient::ports::mock::MockPatientPort;
use domain_patient::PatientPort;
use domain_reconciliation::ports::mock::MockReconciliationPort;
use domain_reconciliation::{MatchSignal, PeriodCandidate, ReconciliationService};

use test_utils::fixtures::{DocumentFixtures, MoneyFixtures, TemporalFixtures};
use test_utils::{TestPatientBuilder, TestTransactionBuilder};

struct Practice {
    therapist: TherapistId,
    billing_store: Arc<MockBillingStore>,
    patients: Arc<MockPatientPort>,
    sessions: Arc<MockSessionSource>,
    reconciliation_port: Arc<MockReconciliationPort>,
    invoicing_store: Arc<MockInvoicingPort>,
    billing: BillingPeriodService,
    payments: PaymentService,
    reconciliation: ReconciliationService,
    invoicing: InvoiceService,
}

impl Practice {
    fn new() -> Self {
        let therapist = TherapistId::new();
        let billing_store = Arc::new(MockBillingStore::new());
        let patients = Arc::new(MockPatientPort::new());
        let sessions = Arc::new(MockSessionSource::new());
        let reconciliation_port = Arc::new(MockReconciliationPort::new());
        let invoicing_store = Arc::new(MockInvoicingPort::new());

        let billing = BillingPeriodService::new(
            billing_store.clone(),
            patients.clone(),
            sessions.clone(),
            Arc::new(RecordingNotificationSink::new()),
        );
        let payments = PaymentService::new(billing_store.clone());
        let reconciliation = ReconciliationService::new(reconciliation_port.clone());
        let invoicing = InvoiceService::new(
            invoicing_store.clone(),
            Arc::new(MockInvoiceProvider::new()),
        );

        Self {
            therapist,
            billing_store,
            patients,
            sessions,
            reconciliation_port,
            invoicing_store,
            billing,
            payments,
            reconciliation,
            invoicing,
        }
    }

    /// Mirrors what the SQL read models derive automatically: an unpaid
    /// period becomes a match candidate and the gate learns the period view
    async fn sync_read_models(
        &self,
        period: &domain_billing::BillingPeriod,
        patient: &domain_patient::Patient,
    ) {
        if period.status == PeriodStatus::Processed {
            self.reconciliation_port
                .add_candidate(PeriodCandidate {
                    billing_period_id: period.id,
                    therapist_id: period.therapist_id,
                    patient_id: period.patient_id,
                    patient_name: patient.name.clone(),
                    patient_document: patient.document.clone(),
                    billing_reference: period.billing_reference.clone(),
                    total_amount: period.total_amount,
                    month: period.month,
                })
                .await;
        }
        self.invoicing_store
            .upsert_period_view(PeriodBillingView {
                billing_period_id: period.id,
                therapist_id: period.therapist_id,
                patient_name: patient.name.clone(),
                patient_document: patient.document.clone(),
                total_amount: period.total_amount,
                month: period.month,
                is_paid: period.status == PeriodStatus::Paid,
            })
            .await;
    }
}

/// The full billing journey: three June sessions at R$ 180,00 process into
/// a R$ 540,00 period; a matching bank transfer is suggested at full
/// confidence; confirming it settles the period; issuance is gated on the
/// digital certificate.
#[tokio::test]
async fn test_maria_silva_full_journey() {
    let practice = Practice::new();

    // Maria: price 18000 cents, billing starts 2025-06-01
    let maria = TestPatientBuilder::new(practice.therapist)
        .with_name("Maria Silva")
        .with_document(DocumentFixtures::cpf())
        .build();
    practice.patients.create_patient(&maria).await.unwrap();

    // Three attended sessions on June 2nd, 9th, 16th
    for day in [2, 9, 16] {
        practice
            .sessions
            .add_session(
                maria.id,
                SessionEvent {
                    external_event_id: format!("cal-2025-06-{:02}", day),
                    date: TemporalFixtures::day(2025, 6, day),
                    time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                    status: SessionStatus::Attended,
                },
            )
            .await;
    }

    // Process June
    let period = practice
        .billing
        .process_charges(
            practice.therapist,
            maria.id,
            TemporalFixtures::june_2025(),
            "dra.ana",
        )
        .await
        .unwrap();
    assert_eq!(period.session_count, 3);
    assert_eq!(period.total_amount, MoneyFixtures::three_session_total());
    assert_eq!(period.status, PeriodStatus::Processed);

    practice.sync_read_models(&period, &maria).await;

    // A bank transfer arrives carrying Maria's reference and CPF
    let transaction = TestTransactionBuilder::new(practice.therapist)
        .with_amount(period.total_amount)
        .with_description(format!("PIX RECEBIDO {}", period.billing_reference))
        .with_date(TemporalFixtures::day(2025, 7, 1))
        .with_document(DocumentFixtures::cpf())
        .build();
    practice
        .reconciliation_port
        .add_transaction(transaction.clone())
        .await;

    let matches = practice
        .reconciliation
        .find_potential_matches(
            practice.therapist,
            TemporalFixtures::day(2025, 7, 1),
            TemporalFixtures::day(2025, 7, 31),
            10,
        )
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    let suggestion = &matches[0];
    assert_eq!(suggestion.billing_period_id, period.id);
    assert!(suggestion.confidence >= 0.95);
    assert!(suggestion.has_signal(MatchSignal::ReferenceMatch));
    assert!(suggestion.has_signal(MatchSignal::CpfMatch));
    assert!(suggestion.has_signal(MatchSignal::ExactAmountMatch));

    // The operator confirms the suggestion
    let payment = practice
        .payments
        .record_payment(RecordPaymentRequest {
            billing_period_id: suggestion.billing_period_id,
            amount: suggestion.suggestion.amount,
            method: domain_billing::PaymentMethod::Pix,
            payment_date: suggestion.suggestion.payment_date,
            reference_number: None,
            bank_transaction_id: Some(suggestion.suggestion.bank_transaction_id),
        })
        .await
        .unwrap();
    assert_eq!(payment.amount, period.total_amount);

    let settled = practice.billing.get_period(period.id).await.unwrap();
    assert_eq!(settled.status, PeriodStatus::Paid);

    // The claimed transaction disappears from later match runs
    practice
        .reconciliation_port
        .claim_transaction(transaction.id)
        .await;
    practice.reconciliation_port.remove_candidate(period.id).await;
    let matches = practice
        .reconciliation
        .find_potential_matches(
            practice.therapist,
            TemporalFixtures::day(2025, 7, 1),
            TemporalFixtures::day(2025, 7, 31),
            10,
        )
        .await
        .unwrap();
    assert!(matches.is_empty());

    // Issuance fails without a certificate...
    practice.sync_read_models(&settled, &maria).await;
    let err = practice
        .invoicing
        .request_invoice(period.id)
        .await
        .unwrap_err();
    assert!(matches!(err, InvoicingError::Certificate(_)));

    // ...and succeeds once one is on file
    practice
        .invoicing_store
        .add_certificate(DigitalCertificate::new(
            practice.therapist,
            "CN=DRA ANA:98765432100",
            Utc::now() + chrono::Duration::days(365),
        ))
        .await;
    let invoice = practice.invoicing.request_invoice(period.id).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Issued);
    assert_eq!(invoice.billing_period_id, period.id);

    // One document per paid period
    let err = practice
        .invoicing
        .request_invoice(period.id)
        .await
        .unwrap_err();
    assert!(matches!(err, InvoicingError::DuplicateInvoice));
}

/// Voiding after a mistaken processing frees the month, and the replacement
/// period gets a fresh reference
#[tokio::test]
async fn test_reprocessing_after_void() {
    let practice = Practice::new();
    let maria = TestPatientBuilder::new(practice.therapist)
        .with_name("Maria Silva")
        .build();
    practice.patients.create_patient(&maria).await.unwrap();

    practice
        .sessions
        .add_session(
            maria.id,
            SessionEvent {
                external_event_id: "cal-1".to_string(),
                date: TemporalFixtures::day(2025, 6, 2),
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                status: SessionStatus::Attended,
            },
        )
        .await;

    let first = practice
        .billing
        .process_charges(
            practice.therapist,
            maria.id,
            TemporalFixtures::june_2025(),
            "dra.ana",
        )
        .await
        .unwrap();
    practice
        .billing
        .void_period(first.id, "session prices were outdated")
        .await
        .unwrap();

    let second = practice
        .billing
        .process_charges(
            practice.therapist,
            maria.id,
            TemporalFixtures::june_2025(),
            "dra.ana",
        )
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.billing_reference, second.billing_reference);

    // Exactly one live period remains
    let periods = practice
        .billing_store
        .periods_for_patient(maria.id)
        .await
        .unwrap();
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].id, second.id);
}
