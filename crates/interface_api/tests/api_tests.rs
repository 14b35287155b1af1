//! Router-level tests over the in-memory adapters
//!
//! The same router that production wires onto PostgreSQL is exercised here
//! over the domain mocks, token to response.

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};

use core_kernel::{Money, PatientId, TherapistId};
use domain_billing::ports::mock::{
    MockBillingStore, MockSessionSource, RecordingNotificationSink,
};
use domain_billing::{BillingPeriodService, PaymentService, SessionEvent, SessionStatus};
use domain_invoicing::ports::mock::MockInvoicingPort;
use domain_invoicing::{InvoiceService, MockInvoiceProvider};
use domain_patient::ports::mock::MockPatientPort;
use domain_patient::{Patient, PatientPort};
use domain_reconciliation::ports::mock::MockReconciliationPort;
use domain_reconciliation::ReconciliationService;

use interface_api::auth::issue_token;
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};

struct TestHarness {
    server: TestServer,
    therapist: TherapistId,
    token: String,
    patients: Arc<MockPatientPort>,
    sessions: Arc<MockSessionSource>,
    invoicing_store: Arc<MockInvoicingPort>,
}

async fn harness() -> TestHarness {
    let config = ApiConfig::default();
    let therapist = TherapistId::new();

    let billing_store = Arc::new(MockBillingStore::new());
    let patients = Arc::new(MockPatientPort::new());
    let sessions = Arc::new(MockSessionSource::new());
    let invoicing_store = Arc::new(MockInvoicingPort::new());

    let state = AppState {
        billing: Arc::new(BillingPeriodService::new(
            billing_store.clone(),
            patients.clone(),
            sessions.clone(),
            Arc::new(RecordingNotificationSink::new()),
        )),
        payments: Arc::new(PaymentService::new(billing_store)),
        reconciliation: Arc::new(ReconciliationService::new(Arc::new(
            MockReconciliationPort::new(),
        ))),
        invoicing: Arc::new(InvoiceService::new(
            invoicing_store.clone(),
            Arc::new(MockInvoiceProvider::new()),
        )),
        patients: patients.clone(),
        config: config.clone(),
    };

    let server = TestServer::new(create_router(state)).unwrap();
    let token = issue_token(therapist, &config.jwt_secret, config.jwt_expiration_secs).unwrap();

    TestHarness {
        server,
        therapist,
        token,
        patients,
        sessions,
        invoicing_store,
    }
}

impl TestHarness {
    fn bearer(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", self.token)).unwrap()
    }

    async fn add_patient_with_sessions(&self, name: &str, session_days: &[u32]) -> PatientId {
        let patient = Patient::new(
            self.therapist,
            name,
            Money::from_cents(18000),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        );
        let id = patient.id;
        self.patients.create_patient(&patient).await.unwrap();

        for day in session_days {
            self.sessions
                .add_session(
                    id,
                    SessionEvent {
                        external_event_id: format!("evt-{}", day),
                        date: NaiveDate::from_ymd_opt(2025, 6, *day).unwrap(),
                        time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                        status: SessionStatus::Attended,
                    },
                )
                .await;
        }
        id
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let h = harness().await;
    let response = h.server.get("/health").await;
    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let h = harness().await;
    let response = h
        .server
        .get("/api/v1/billing-periods/summary?year=2025&month=6")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patient_registration_and_listing() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/v1/patients")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "name": "Maria Silva",
            "document": "111.444.777-35",
            "session_price_cents": 18000,
            "billing_start_date": "2025-06-01",
        }))
        .await;
    response.assert_status(StatusCode::OK);
    let created: Value = response.json();
    assert_eq!(created["name"], "Maria Silva");
    assert_eq!(created["document"], "111.444.777-35");
    assert_eq!(created["is_active"], true);

    // A malformed CPF never reaches storage
    let response = h
        .server
        .post("/api/v1/patients")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "name": "Joao Souza",
            "document": "123",
            "session_price_cents": 20000,
            "billing_start_date": "2025-06-01",
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let listed: Value = h
        .server
        .get("/api/v1/patients")
        .add_header(AUTHORIZATION, h.bearer())
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let fetched: Value = h
        .server
        .get(&format!(
            "/api/v1/patients/{}",
            created["id"].as_str().unwrap()
        ))
        .add_header(AUTHORIZATION, h.bearer())
        .await
        .json();
    assert_eq!(fetched["id"], created["id"]);
}

#[tokio::test]
async fn test_process_charges_end_to_end() {
    let h = harness().await;
    let patient = h
        .add_patient_with_sessions("Maria Silva", &[2, 9, 16])
        .await;

    let response = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "patient_id": patient.as_uuid(),
            "year": 2025,
            "month": 6,
        }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["session_count"], 3);
    assert_eq!(body["total_amount_cents"], 54000);
    assert_eq!(body["status"], "processed");

    // Reprocessing the same month conflicts
    let response = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "patient_id": patient.as_uuid(),
            "year": 2025,
            "month": 6,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_month_is_unprocessable() {
    let h = harness().await;
    let patient = h.add_patient_with_sessions("Maria Silva", &[2]).await;

    let response = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "patient_id": patient.as_uuid(),
            "year": 2025,
            "month": 13,
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_payment_flow_and_chronology_conflict() {
    let h = harness().await;
    let patient = h.add_patient_with_sessions("Maria Silva", &[2]).await;
    // A July session too, so two months can be processed
    h.sessions
        .add_session(
            patient,
            SessionEvent {
                external_event_id: "evt-jul".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 7, 7).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                status: SessionStatus::Attended,
            },
        )
        .await;

    let june: Value = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({ "patient_id": patient.as_uuid(), "year": 2025, "month": 6 }))
        .await
        .json();
    let july: Value = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({ "patient_id": patient.as_uuid(), "year": 2025, "month": 7 }))
        .await
        .json();

    // July cannot settle while June is open
    let response = h
        .server
        .post("/api/v1/payments")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "billing_period_id": july["id"],
            "amount_cents": 18000,
            "method": "pix",
            "payment_date": "2025-08-01",
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // June settles fine
    let response = h
        .server
        .post("/api/v1/payments")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({
            "billing_period_id": june["id"],
            "amount_cents": 18000,
            "method": "pix",
            "payment_date": "2025-07-01",
        }))
        .await;
    response.assert_status(StatusCode::OK);
    let payment: Value = response.json();

    // Outstanding moved to July
    let outstanding: Value = h
        .server
        .get(&format!("/api/v1/patients/{}/outstanding", patient.as_uuid()))
        .add_header(AUTHORIZATION, h.bearer())
        .await
        .json();
    assert_eq!(outstanding["has_outstanding"], true);
    assert_eq!(outstanding["oldest_unpaid_month"], 7);

    // Cancelling the payment reverts June to processed
    let response = h
        .server
        .delete(&format!("/api/v1/payments/{}", payment["id"].as_str().unwrap()))
        .add_header(AUTHORIZATION, h.bearer())
        .await;
    response.assert_status(StatusCode::OK);
    let period: Value = response.json();
    assert_eq!(period["status"], "processed");
}

#[tokio::test]
async fn test_invoice_requires_paid_period() {
    let h = harness().await;
    let patient = h.add_patient_with_sessions("Maria Silva", &[2]).await;

    let period: Value = h
        .server
        .post("/api/v1/billing-periods")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({ "patient_id": patient.as_uuid(), "year": 2025, "month": 6 }))
        .await
        .json();

    // Register the gate's view of this (still unpaid) period
    let period_id: core_kernel::BillingPeriodId =
        period["id"].as_str().unwrap().parse().unwrap();
    h.invoicing_store
        .upsert_period_view(domain_invoicing::PeriodBillingView {
            billing_period_id: period_id,
            therapist_id: h.therapist,
            patient_name: "Maria Silva".to_string(),
            patient_document: None,
            total_amount: Money::from_cents(18000),
            month: core_kernel::BillingMonth::new(2025, 6).unwrap(),
            is_paid: false,
        })
        .await;

    let response = h
        .server
        .post("/api/v1/invoices")
        .add_header(AUTHORIZATION, h.bearer())
        .json(&json!({ "billing_period_id": period["id"] }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_match_query_shape() {
    let h = harness().await;
    let response = h
        .server
        .get("/api/v1/reconciliation/matches?start=2025-07-01&end=2025-07-31&limit=10")
        .add_header(AUTHORIZATION, h.bearer())
        .await;
    response.assert_status(StatusCode::OK);
    let matches: Value = response.json();
    assert!(matches.as_array().unwrap().is_empty());
}
