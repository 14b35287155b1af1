//! Billing domain ports
//!
//! Three capabilities back the billing services:
//!
//! - `BillingPort`: the storage contract. Its mutating operations are
//!   *atomic*: implementations must perform the read-check-transition inside
//!   one transaction (row locks in PostgreSQL, a single write guard in the
//!   in-memory mock), so two racing callers can never both observe the same
//!   pre-state and both transition.
//! - `SessionSource`: the external calendar supplying billable session
//!   events.
//! - `NotificationSink`: receives rendered summaries after charges are
//!   processed; failures are logged and never fail the billing operation.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    BillingMonth, BillingPeriodId, DomainPort, PatientId, PaymentId, PortError, TherapistId,
};

use crate::events::BillingEvent;
use crate::payment::Payment;
use crate::period::BillingPeriod;
use crate::session::SessionEvent;

/// Storage port for billing periods and payments
#[async_trait]
pub trait BillingPort: DomainPort {
    /// Retrieves a period by ID (any status, including void)
    async fn find_period(&self, id: BillingPeriodId) -> Result<BillingPeriod, PortError>;

    /// Retrieves the non-void period for an identity key, if one exists
    async fn find_active_period(
        &self,
        therapist_id: TherapistId,
        patient_id: PatientId,
        month: BillingMonth,
    ) -> Result<Option<BillingPeriod>, PortError>;

    /// All non-void periods of a patient, oldest month first
    async fn periods_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<BillingPeriod>, PortError>;

    /// All non-void periods of a therapist for one month
    async fn periods_for_month(
        &self,
        therapist_id: TherapistId,
        month: BillingMonth,
    ) -> Result<Vec<BillingPeriod>, PortError>;

    /// Persists a new period with its snapshots atomically
    ///
    /// Fails with `Conflict` when a non-void period already exists for the
    /// same (therapist, patient, month), including when this call loses a
    /// race against a concurrent insert.
    async fn insert_period(&self, period: &BillingPeriod) -> Result<(), PortError>;

    /// Voids a period under lock
    ///
    /// Re-validates inside the transaction that the period is still
    /// `processed` and has zero payments; fails with `Conflict` otherwise,
    /// `NotFound` when missing or already void.
    async fn void_period(
        &self,
        id: BillingPeriodId,
        reason: &str,
    ) -> Result<BillingPeriod, PortError>;

    /// Records a payment and transitions its period to `paid`, atomically
    ///
    /// Under the lock, implementations re-validate that the period is still
    /// `processed`, that it is the patient's oldest unpaid period, and that
    /// the linked bank transaction (if any) is still unclaimed. Any of these
    /// failing yields `Conflict`.
    async fn add_payment(&self, payment: &Payment) -> Result<BillingPeriod, PortError>;

    /// Deletes a payment; reverts its period to `processed` when it was the
    /// last one. Returns the deleted payment and the updated period.
    async fn remove_payment(
        &self,
        id: PaymentId,
    ) -> Result<(Payment, BillingPeriod), PortError>;

    /// Retrieves a payment by ID
    async fn find_payment(&self, id: PaymentId) -> Result<Payment, PortError>;

    /// All payments recorded against a period
    async fn payments_for_period(
        &self,
        id: BillingPeriodId,
    ) -> Result<Vec<Payment>, PortError>;
}

/// External calendar supplying session events
#[async_trait]
pub trait SessionSource: DomainPort {
    /// Sessions of a patient in the inclusive date range
    async fn get_sessions(
        &self,
        patient_id: PatientId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SessionEvent>, PortError>;
}

/// Sink for rendered billing notifications
#[async_trait]
pub trait NotificationSink: DomainPort {
    /// Delivers the event summary; callers treat failures as non-fatal
    async fn publish(&self, event: &BillingEvent) -> Result<(), PortError>;
}

/// Notification sink that writes summaries to the log
///
/// The production deep-link delivery lives outside this system; this sink is
/// the default wiring so processing always leaves an operator-visible trace.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotificationSink;

impl DomainPort for LoggingNotificationSink {}

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn publish(&self, event: &BillingEvent) -> Result<(), PortError> {
        tracing::info!(summary = %event.summary(), "billing notification");
        Ok(())
    }
}

/// In-memory mock implementations for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::outstanding;

    /// In-memory billing store enforcing the same constraints as the
    /// relational schema: one non-void period per identity key, one payment
    /// per bank transaction, oldest-unpaid-first settlement.
    #[derive(Debug, Default)]
    pub struct MockBillingStore {
        state: Arc<RwLock<StoreState>>,
    }

    #[derive(Debug, Default)]
    struct StoreState {
        periods: HashMap<BillingPeriodId, BillingPeriod>,
        payments: HashMap<PaymentId, Payment>,
    }

    impl MockBillingStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DomainPort for MockBillingStore {}

    #[async_trait]
    impl BillingPort for MockBillingStore {
        async fn find_period(&self, id: BillingPeriodId) -> Result<BillingPeriod, PortError> {
            self.state
                .read()
                .await
                .periods
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BillingPeriod", id))
        }

        async fn find_active_period(
            &self,
            therapist_id: TherapistId,
            patient_id: PatientId,
            month: BillingMonth,
        ) -> Result<Option<BillingPeriod>, PortError> {
            let state = self.state.read().await;
            Ok(state
                .periods
                .values()
                .find(|p| {
                    p.therapist_id == therapist_id
                        && p.patient_id == patient_id
                        && p.month == month
                        && p.status != crate::period::PeriodStatus::Void
                })
                .cloned())
        }

        async fn periods_for_patient(
            &self,
            patient_id: PatientId,
        ) -> Result<Vec<BillingPeriod>, PortError> {
            let state = self.state.read().await;
            let mut periods: Vec<_> = state
                .periods
                .values()
                .filter(|p| {
                    p.patient_id == patient_id
                        && p.status != crate::period::PeriodStatus::Void
                })
                .cloned()
                .collect();
            periods.sort_by_key(|p| p.month);
            Ok(periods)
        }

        async fn periods_for_month(
            &self,
            therapist_id: TherapistId,
            month: BillingMonth,
        ) -> Result<Vec<BillingPeriod>, PortError> {
            let state = self.state.read().await;
            let mut periods: Vec<_> = state
                .periods
                .values()
                .filter(|p| {
                    p.therapist_id == therapist_id
                        && p.month == month
                        && p.status != crate::period::PeriodStatus::Void
                })
                .cloned()
                .collect();
            periods.sort_by_key(|p| p.id.as_uuid().to_owned());
            Ok(periods)
        }

        async fn insert_period(&self, period: &BillingPeriod) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let duplicate = state.periods.values().any(|p| {
                p.therapist_id == period.therapist_id
                    && p.patient_id == period.patient_id
                    && p.month == period.month
                    && p.status != crate::period::PeriodStatus::Void
            });
            if duplicate {
                return Err(PortError::conflict(format!(
                    "billing period already exists for {}",
                    period.month
                )));
            }
            state.periods.insert(period.id, period.clone());
            Ok(())
        }

        async fn void_period(
            &self,
            id: BillingPeriodId,
            reason: &str,
        ) -> Result<BillingPeriod, PortError> {
            let mut state = self.state.write().await;
            let has_payments = state
                .payments
                .values()
                .any(|p| p.billing_period_id == id);

            let period = state
                .periods
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("BillingPeriod", id))?;

            if period.status == crate::period::PeriodStatus::Void {
                return Err(PortError::not_found("BillingPeriod", id));
            }
            if has_payments || period.status != crate::period::PeriodStatus::Processed {
                return Err(PortError::conflict(
                    "billing period is no longer voidable",
                ));
            }

            period
                .void(reason)
                .map_err(|e| PortError::conflict(e.to_string()))?;
            Ok(period.clone())
        }

        async fn add_payment(&self, payment: &Payment) -> Result<BillingPeriod, PortError> {
            let mut state = self.state.write().await;

            let period = state
                .periods
                .get(&payment.billing_period_id)
                .cloned()
                .ok_or_else(|| {
                    PortError::not_found("BillingPeriod", payment.billing_period_id)
                })?;

            if !period.is_payable() {
                return Err(PortError::conflict(format!(
                    "billing period {} is not payable",
                    period.id
                )));
            }

            // Chronological settlement, re-derived under the write guard
            let patient_periods: Vec<_> = state
                .periods
                .values()
                .filter(|p| {
                    p.patient_id == period.patient_id
                        && p.status != crate::period::PeriodStatus::Void
                })
                .cloned()
                .collect();
            if let Some(oldest) = outstanding::oldest_unpaid(&patient_periods) {
                if oldest.id != period.id {
                    return Err(PortError::conflict(format!(
                        "period {} must be settled first",
                        oldest.month
                    )));
                }
            }

            // One confirmed payment per bank transaction
            if let Some(txn_id) = payment.bank_transaction_id {
                let claimed = state
                    .payments
                    .values()
                    .any(|p| p.bank_transaction_id == Some(txn_id));
                if claimed {
                    return Err(PortError::conflict(format!(
                        "bank transaction {} is already claimed",
                        txn_id
                    )));
                }
            }

            state.payments.insert(payment.id, payment.clone());
            let period = state
                .periods
                .get_mut(&payment.billing_period_id)
                .ok_or_else(|| PortError::internal("period vanished under write lock"))?;
            period
                .mark_paid()
                .map_err(|e| PortError::conflict(e.to_string()))?;
            Ok(period.clone())
        }

        async fn remove_payment(
            &self,
            id: PaymentId,
        ) -> Result<(Payment, BillingPeriod), PortError> {
            let mut state = self.state.write().await;

            let payment = state
                .payments
                .remove(&id)
                .ok_or_else(|| PortError::not_found("Payment", id))?;

            let remaining = state
                .payments
                .values()
                .any(|p| p.billing_period_id == payment.billing_period_id);

            let period = state
                .periods
                .get_mut(&payment.billing_period_id)
                .ok_or_else(|| {
                    PortError::not_found("BillingPeriod", payment.billing_period_id)
                })?;

            if !remaining && period.status == crate::period::PeriodStatus::Paid {
                period
                    .revert_to_processed()
                    .map_err(|e| PortError::conflict(e.to_string()))?;
            }
            Ok((payment, period.clone()))
        }

        async fn find_payment(&self, id: PaymentId) -> Result<Payment, PortError> {
            self.state
                .read()
                .await
                .payments
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payment", id))
        }

        async fn payments_for_period(
            &self,
            id: BillingPeriodId,
        ) -> Result<Vec<Payment>, PortError> {
            let state = self.state.read().await;
            let mut payments: Vec<_> = state
                .payments
                .values()
                .filter(|p| p.billing_period_id == id)
                .cloned()
                .collect();
            payments.sort_by_key(|p| p.created_at);
            Ok(payments)
        }
    }

    /// Mutable in-memory session calendar
    ///
    /// Tests mutate it after processing to prove that persisted snapshots do
    /// not change.
    #[derive(Debug, Default)]
    pub struct MockSessionSource {
        sessions: Arc<RwLock<HashMap<PatientId, Vec<SessionEvent>>>>,
    }

    impl MockSessionSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a session event to a patient's calendar
        pub async fn add_session(&self, patient_id: PatientId, event: SessionEvent) {
            self.sessions
                .write()
                .await
                .entry(patient_id)
                .or_default()
                .push(event);
        }

        /// Removes every session of a patient (simulates calendar edits)
        pub async fn clear_sessions(&self, patient_id: PatientId) {
            self.sessions.write().await.remove(&patient_id);
        }
    }

    impl DomainPort for MockSessionSource {}

    #[async_trait]
    impl SessionSource for MockSessionSource {
        async fn get_sessions(
            &self,
            patient_id: PatientId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<SessionEvent>, PortError> {
            let sessions = self.sessions.read().await;
            Ok(sessions
                .get(&patient_id)
                .map(|events| {
                    events
                        .iter()
                        .filter(|e| e.date >= start && e.date <= end)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    /// Notification sink that records every published event
    #[derive(Debug, Default)]
    pub struct RecordingNotificationSink {
        events: Arc<RwLock<Vec<BillingEvent>>>,
    }

    impl RecordingNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Everything published so far
        pub async fn recorded(&self) -> Vec<BillingEvent> {
            self.events.read().await.clone()
        }
    }

    impl DomainPort for RecordingNotificationSink {}

    #[async_trait]
    impl NotificationSink for RecordingNotificationSink {
        async fn publish(&self, event: &BillingEvent) -> Result<(), PortError> {
            self.events.write().await.push(event.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockBillingStore;
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::Money;

    use crate::payment::PaymentMethod;

    fn period_for(
        therapist: TherapistId,
        patient: PatientId,
        year: i32,
        month: u32,
    ) -> BillingPeriod {
        BillingPeriod::new(
            therapist,
            patient,
            BillingMonth::new(year, month).unwrap(),
            vec![],
            Money::from_cents(18000),
            "tester",
        )
    }

    fn payment_for(period: &BillingPeriod) -> Payment {
        Payment::new(
            period.id,
            period.total_amount,
            PaymentMethod::Pix,
            NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_store_rejects_duplicate_active_period() {
        let store = MockBillingStore::new();
        let therapist = TherapistId::new();
        let patient = PatientId::new();

        store
            .insert_period(&period_for(therapist, patient, 2025, 6))
            .await
            .unwrap();
        let err = store
            .insert_period(&period_for(therapist, patient, 2025, 6))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_void_frees_the_identity_key() {
        let store = MockBillingStore::new();
        let therapist = TherapistId::new();
        let patient = PatientId::new();

        let first = period_for(therapist, patient, 2025, 6);
        store.insert_period(&first).await.unwrap();
        store.void_period(first.id, "wrong price").await.unwrap();

        // Key is free again
        store
            .insert_period(&period_for(therapist, patient, 2025, 6))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_payment_enforces_oldest_first() {
        let store = MockBillingStore::new();
        let therapist = TherapistId::new();
        let patient = PatientId::new();

        let jan = period_for(therapist, patient, 2025, 1);
        let feb = period_for(therapist, patient, 2025, 2);
        store.insert_period(&jan).await.unwrap();
        store.insert_period(&feb).await.unwrap();

        let err = store.add_payment(&payment_for(&feb)).await.unwrap_err();
        assert!(err.is_conflict());

        store.add_payment(&payment_for(&jan)).await.unwrap();
        store.add_payment(&payment_for(&feb)).await.unwrap();
    }

    #[tokio::test]
    async fn test_bank_transaction_claimed_once() {
        let store = MockBillingStore::new();
        let therapist = TherapistId::new();
        let txn = core_kernel::BankTransactionId::new();

        let p1 = period_for(therapist, PatientId::new(), 2025, 6);
        let p2 = period_for(therapist, PatientId::new(), 2025, 6);
        store.insert_period(&p1).await.unwrap();
        store.insert_period(&p2).await.unwrap();

        store
            .add_payment(&payment_for(&p1).with_bank_transaction(txn))
            .await
            .unwrap();
        let err = store
            .add_payment(&payment_for(&p2).with_bank_transaction(txn))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_remove_last_payment_reverts_period() {
        let store = MockBillingStore::new();
        let period = period_for(TherapistId::new(), PatientId::new(), 2025, 6);
        store.insert_period(&period).await.unwrap();

        let payment = payment_for(&period);
        store.add_payment(&payment).await.unwrap();

        let (removed, updated) = store.remove_payment(payment.id).await.unwrap();
        assert_eq!(removed.id, payment.id);
        assert_eq!(updated.status, crate::period::PeriodStatus::Processed);
    }
}
