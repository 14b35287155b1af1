//! Billing period aggregate
//!
//! A billing period is the monthly aggregation of a patient's billable
//! sessions into one payable unit. Its identity key is
//! (therapist, patient, year, month), scoped to non-void rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BillingMonth, BillingPeriodId, Money, PatientId, TherapistId};

use crate::error::BillingError;
use crate::session::SessionSnapshot;

/// Billing period status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    /// Charges computed, awaiting payment
    Processed,
    /// Settled by at least one payment
    Paid,
    /// Cancelled before any payment; terminal, frees the identity key
    Void,
}

impl PeriodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodStatus::Processed => "processed",
            PeriodStatus::Paid => "paid",
            PeriodStatus::Void => "void",
        }
    }
}

/// A monthly billing period with its frozen session snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Unique identifier
    pub id: BillingPeriodId,
    /// Owning therapist
    pub therapist_id: TherapistId,
    /// Billed patient
    pub patient_id: PatientId,
    /// The aggregated calendar month
    pub month: BillingMonth,
    /// Number of billed sessions
    pub session_count: u32,
    /// Total charged, in cents
    pub total_amount: Money,
    /// Short reference patients put in their transfer descriptions
    pub billing_reference: String,
    /// Immutable snapshots of the billed sessions
    pub snapshots: Vec<SessionSnapshot>,
    /// Current lifecycle status
    pub status: PeriodStatus,
    /// When charges were processed
    pub processed_at: DateTime<Utc>,
    /// Operator who processed the charges
    pub processed_by: String,
    /// Reason given when voided
    pub void_reason: Option<String>,
    /// When the period was voided
    pub voided_at: Option<DateTime<Utc>>,
}

impl BillingPeriod {
    /// Creates a freshly-processed period from captured snapshots
    pub fn new(
        therapist_id: TherapistId,
        patient_id: PatientId,
        month: BillingMonth,
        snapshots: Vec<SessionSnapshot>,
        total_amount: Money,
        processed_by: impl Into<String>,
    ) -> Self {
        let id = BillingPeriodId::new_v7();
        Self {
            id,
            therapist_id,
            patient_id,
            month,
            session_count: snapshots.len() as u32,
            total_amount,
            billing_reference: billing_reference_for(&id),
            snapshots,
            status: PeriodStatus::Processed,
            processed_at: Utc::now(),
            processed_by: processed_by.into(),
            void_reason: None,
            voided_at: None,
        }
    }

    /// True if the period can currently accept a payment
    pub fn is_payable(&self) -> bool {
        self.status == PeriodStatus::Processed
    }

    /// True if the period still counts towards the patient's outstanding balance
    pub fn is_unpaid(&self) -> bool {
        self.status == PeriodStatus::Processed
    }

    /// Transitions to `paid` on the first recorded payment
    pub fn mark_paid(&mut self) -> Result<(), BillingError> {
        match self.status {
            PeriodStatus::Processed => {
                self.status = PeriodStatus::Paid;
                Ok(())
            }
            other => Err(BillingError::Validation(format!(
                "cannot mark a {} period as paid",
                other.as_str()
            ))),
        }
    }

    /// Reverts to `processed` once the last payment is cancelled
    pub fn revert_to_processed(&mut self) -> Result<(), BillingError> {
        match self.status {
            PeriodStatus::Paid => {
                self.status = PeriodStatus::Processed;
                Ok(())
            }
            other => Err(BillingError::Validation(format!(
                "cannot revert a {} period to processed",
                other.as_str()
            ))),
        }
    }

    /// Voids the period; only legal while still `processed`
    ///
    /// Payment-existence is checked by the caller against storage; a paid
    /// period is rejected here outright.
    pub fn void(&mut self, reason: impl Into<String>) -> Result<(), BillingError> {
        match self.status {
            PeriodStatus::Processed => {
                self.status = PeriodStatus::Void;
                self.void_reason = Some(reason.into());
                self.voided_at = Some(Utc::now());
                Ok(())
            }
            PeriodStatus::Paid => Err(BillingError::PeriodHasPayment),
            PeriodStatus::Void => Err(BillingError::NotFound(format!(
                "billing period {} is already void",
                self.id
            ))),
        }
    }
}

/// Derives the short billing reference from the period id
///
/// The reference is what patients are asked to put in their bank-transfer
/// descriptions, so it must be short, stable, and unambiguous in uppercase.
/// The tail of the UUID is used: period ids are time-ordered, so their
/// leading hex is shared by every period created in the same window.
fn billing_reference_for(id: &BillingPeriodId) -> String {
    let hex = id.as_uuid().simple().to_string().to_uppercase();
    format!("LV-{}", &hex[hex.len() - 6..])
}
