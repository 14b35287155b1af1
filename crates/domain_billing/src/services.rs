//! Billing application services
//!
//! `BillingPeriodService` owns the period lifecycle (process, void, derive
//! outstanding, summarize); `PaymentService` owns payment recording and
//! cancellation. Both speak to storage through `BillingPort`, whose mutating
//! operations are atomic: the services do the business validation up front
//! for precise error reporting, and the port re-validates under lock so races
//! surface as conflicts instead of corrupt state.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::{
    BankTransactionId, BillingMonth, BillingPeriodId, Money, PatientId, PaymentId, TherapistId,
};
use domain_patient::PatientPort;

use crate::error::BillingError;
use crate::events::BillingEvent;
use crate::outstanding::{self, OutstandingBalance};
use crate::payment::{Payment, PaymentMethod};
use crate::period::{BillingPeriod, PeriodStatus};
use crate::ports::{BillingPort, NotificationSink, SessionSource};
use crate::session::SessionSnapshot;

/// One row of the monthly billing overview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSummary {
    pub billing_period_id: BillingPeriodId,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub month: BillingMonth,
    pub session_count: u32,
    pub total_amount: Money,
    pub status: PeriodStatus,
    pub billing_reference: String,
}

/// Service owning the billing-period lifecycle
pub struct BillingPeriodService {
    store: Arc<dyn BillingPort>,
    patients: Arc<dyn PatientPort>,
    sessions: Arc<dyn SessionSource>,
    notifications: Arc<dyn NotificationSink>,
}

impl BillingPeriodService {
    pub fn new(
        store: Arc<dyn BillingPort>,
        patients: Arc<dyn PatientPort>,
        sessions: Arc<dyn SessionSource>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            patients,
            sessions,
            notifications,
        }
    }

    /// Computes and persists a patient's charges for one month
    ///
    /// Pulls qualifying sessions from the session source (on/after the
    /// patient's billing-start date, inside the month, not cancelled),
    /// freezes them into snapshots, and persists the period atomically.
    ///
    /// # Errors
    ///
    /// - `AlreadyProcessed` when a non-void period exists for the key,
    ///   including when this call loses a concurrent-processing race
    /// - `Validation` when the month yields no billable sessions
    pub async fn process_charges(
        &self,
        therapist_id: TherapistId,
        patient_id: PatientId,
        month: BillingMonth,
        processed_by: &str,
    ) -> Result<BillingPeriod, BillingError> {
        let patient = self.patients.get_patient(patient_id).await?;
        if patient.therapist_id != therapist_id {
            return Err(BillingError::NotFound(format!("Patient {}", patient_id)));
        }

        if self
            .store
            .find_active_period(therapist_id, patient_id, month)
            .await?
            .is_some()
        {
            return Err(BillingError::AlreadyProcessed { month });
        }

        let window_start = month.first_day().max(patient.billing_start_date);
        let window_end = month.last_day();
        if window_start > window_end {
            return Err(BillingError::Validation(format!(
                "billing for {} starts only on {}",
                patient.name, patient.billing_start_date
            )));
        }

        let events = self
            .sessions
            .get_sessions(patient_id, window_start, window_end)
            .await?;

        let snapshots: Vec<SessionSnapshot> = events
            .iter()
            .filter(|e| e.is_billable() && month.contains(e.date) && patient.is_billable_on(e.date))
            .map(|e| SessionSnapshot::capture(e, patient.name.clone()))
            .collect();

        if snapshots.is_empty() {
            return Err(BillingError::Validation(format!(
                "no billable sessions for {} in {}",
                patient.name, month
            )));
        }

        let total = patient
            .session_price
            .checked_mul(snapshots.len() as i64)?;

        let period = BillingPeriod::new(
            therapist_id,
            patient_id,
            month,
            snapshots,
            total,
            processed_by,
        );

        match self.store.insert_period(&period).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                return Err(BillingError::AlreadyProcessed { month });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            period = %period.id,
            patient = %patient_id,
            month = %month,
            sessions = period.session_count,
            total = %period.total_amount,
            "charges processed"
        );

        let event = BillingEvent::ChargesProcessed {
            billing_period_id: period.id,
            therapist_id,
            patient_id,
            patient_name: patient.name.clone(),
            month,
            session_count: period.session_count,
            total_amount: period.total_amount,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.notifications.publish(&event).await {
            warn!(%err, "charges-processed notification failed; continuing");
        }

        Ok(period)
    }

    /// Voids a billing period, freeing its identity key for reprocessing
    ///
    /// # Errors
    ///
    /// - `NotFound` when the period is missing or already void
    /// - `PeriodHasPayment` when any payment exists
    pub async fn void_period(
        &self,
        period_id: BillingPeriodId,
        reason: &str,
    ) -> Result<(), BillingError> {
        let period = self.store.find_period(period_id).await?;
        if period.status == PeriodStatus::Void {
            return Err(BillingError::NotFound(format!(
                "billing period {} is already void",
                period_id
            )));
        }

        let payments = self.store.payments_for_period(period_id).await?;
        if !payments.is_empty() || period.status == PeriodStatus::Paid {
            return Err(BillingError::PeriodHasPayment);
        }

        self.store.void_period(period_id, reason).await?;
        info!(period = %period_id, reason, "billing period voided");
        Ok(())
    }

    /// Retrieves a billing period with its snapshots
    pub async fn get_period(
        &self,
        period_id: BillingPeriodId,
    ) -> Result<BillingPeriod, BillingError> {
        Ok(self.store.find_period(period_id).await?)
    }

    /// Derives a patient's outstanding balance (oldest unpaid period)
    pub async fn outstanding(
        &self,
        patient_id: PatientId,
    ) -> Result<OutstandingBalance, BillingError> {
        let periods = self.store.periods_for_patient(patient_id).await?;
        Ok(outstanding::derive(&periods))
    }

    /// Per-patient billing overview for one month
    pub async fn monthly_summary(
        &self,
        therapist_id: TherapistId,
        month: BillingMonth,
    ) -> Result<Vec<BillingSummary>, BillingError> {
        let periods = self.store.periods_for_month(therapist_id, month).await?;
        let patients = self.patients.list_patients(therapist_id).await?;
        let names: std::collections::HashMap<_, _> =
            patients.iter().map(|p| (p.id, p.name.clone())).collect();

        let mut summaries: Vec<BillingSummary> = periods
            .into_iter()
            .map(|p| {
                let patient_name = names
                    .get(&p.patient_id)
                    .cloned()
                    .or_else(|| p.snapshots.first().map(|s| s.patient_name.clone()))
                    .unwrap_or_default();
                BillingSummary {
                    billing_period_id: p.id,
                    patient_id: p.patient_id,
                    patient_name,
                    month: p.month,
                    session_count: p.session_count,
                    total_amount: p.total_amount,
                    status: p.status,
                    billing_reference: p.billing_reference,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.patient_name.cmp(&b.patient_name));
        Ok(summaries)
    }
}

/// Everything needed to record a payment
#[derive(Debug, Clone)]
pub struct RecordPaymentRequest {
    pub billing_period_id: BillingPeriodId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: chrono::NaiveDate,
    pub reference_number: Option<String>,
    pub bank_transaction_id: Option<BankTransactionId>,
}

/// Service owning payment recording and cancellation
pub struct PaymentService {
    store: Arc<dyn BillingPort>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn BillingPort>) -> Self {
        Self { store }
    }

    /// Records a payment and settles its billing period
    ///
    /// The period must be `processed` and must be the patient's oldest unpaid
    /// period. The amount is accepted as given; any nonzero payment settles
    /// the period in full.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive amount or a non-payable period
    /// - `ChronologyViolation` when an older month is still unpaid
    /// - `ConcurrencyConflict` when the commit-time re-validation fails
    ///   (racing payment, stale match claiming an already-used transaction)
    pub async fn record_payment(
        &self,
        request: RecordPaymentRequest,
    ) -> Result<Payment, BillingError> {
        if !request.amount.is_positive() {
            return Err(BillingError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }

        let period = self.store.find_period(request.billing_period_id).await?;
        if !period.is_payable() {
            return Err(BillingError::Validation(format!(
                "billing period {} is not payable in status {}",
                period.id,
                period.status.as_str()
            )));
        }

        let patient_periods = self.store.periods_for_patient(period.patient_id).await?;
        if let Some(oldest) = outstanding::oldest_unpaid(&patient_periods) {
            if oldest.id != period.id {
                return Err(BillingError::ChronologyViolation {
                    oldest: oldest.month,
                });
            }
        }

        let mut payment = Payment::new(
            request.billing_period_id,
            request.amount,
            request.method,
            request.payment_date,
        );
        payment.reference_number = request.reference_number;
        payment.bank_transaction_id = request.bank_transaction_id;

        self.store.add_payment(&payment).await?;

        info!(
            payment = %payment.id,
            period = %payment.billing_period_id,
            amount = %payment.amount,
            method = payment.method.as_str(),
            "payment recorded"
        );
        Ok(payment)
    }

    /// Cancels a payment; the period reverts to `processed` when this was the
    /// last payment. Returns the updated period so callers can re-render
    /// outstanding state.
    pub async fn cancel_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<BillingPeriod, BillingError> {
        let (payment, period) = self.store.remove_payment(payment_id).await?;
        info!(
            payment = %payment.id,
            period = %period.id,
            status = period.status.as_str(),
            "payment cancelled"
        );
        Ok(period)
    }
}
