//! Domain events for the billing lifecycle
//!
//! Events capture the significant state changes of billing periods. The
//! charges-processed event is what the notification sink renders into the
//! message sent to the patient; delivery is never a dependency of the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingMonth, BillingPeriodId, Money, PatientId, PaymentId, TherapistId};

/// Domain events emitted by the billing services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
    /// A month's charges were computed and persisted
    ChargesProcessed {
        billing_period_id: BillingPeriodId,
        therapist_id: TherapistId,
        patient_id: PatientId,
        patient_name: String,
        month: BillingMonth,
        session_count: u32,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },

    /// A period was voided before any payment
    PeriodVoided {
        billing_period_id: BillingPeriodId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A payment settled a period
    PaymentRecorded {
        payment_id: PaymentId,
        billing_period_id: BillingPeriodId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    /// A payment was cancelled
    PaymentCancelled {
        payment_id: PaymentId,
        billing_period_id: BillingPeriodId,
        timestamp: DateTime<Utc>,
    },
}

impl BillingEvent {
    /// Renders the human-facing summary line for notification delivery
    pub fn summary(&self) -> String {
        match self {
            BillingEvent::ChargesProcessed {
                patient_name,
                session_count,
                total_amount,
                month,
                ..
            } => format!(
                "{}: {} sessoes em {} totalizando {}",
                patient_name, session_count, month, total_amount
            ),
            BillingEvent::PeriodVoided { billing_period_id, reason, .. } => {
                format!("Periodo {} anulado: {}", billing_period_id, reason)
            }
            BillingEvent::PaymentRecorded { billing_period_id, amount, .. } => {
                format!("Pagamento de {} registrado no periodo {}", amount, billing_period_id)
            }
            BillingEvent::PaymentCancelled { billing_period_id, .. } => {
                format!("Pagamento cancelado no periodo {}", billing_period_id)
            }
        }
    }
}
