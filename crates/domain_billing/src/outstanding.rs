//! Outstanding-balance derivation
//!
//! A read-only derivation over a patient's non-void periods: the earliest
//! period still in `processed` status is the one that must be settled next.
//! Always reports a single oldest entry even when several months are unpaid.

use serde::{Deserialize, Serialize};

use core_kernel::{BillingMonth, Money};

use crate::period::BillingPeriod;

/// What a patient currently owes, anchored to their oldest unpaid month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingBalance {
    /// Whether any unpaid period exists
    pub has_outstanding: bool,
    /// Amount of the oldest unpaid period (zero when none)
    pub amount: Money,
    /// The oldest unpaid month, when any
    pub oldest_unpaid: Option<BillingMonth>,
}

impl OutstandingBalance {
    /// The all-settled balance
    pub fn settled() -> Self {
        Self {
            has_outstanding: false,
            amount: Money::zero(),
            oldest_unpaid: None,
        }
    }
}

/// Returns the patient's oldest unpaid period, if any
pub fn oldest_unpaid(periods: &[BillingPeriod]) -> Option<&BillingPeriod> {
    periods
        .iter()
        .filter(|p| p.is_unpaid())
        .min_by_key(|p| p.month)
}

/// Derives the outstanding balance from a patient's periods
pub fn derive(periods: &[BillingPeriod]) -> OutstandingBalance {
    match oldest_unpaid(periods) {
        Some(oldest) => OutstandingBalance {
            has_outstanding: true,
            amount: oldest.total_amount,
            oldest_unpaid: Some(oldest.month),
        },
        None => OutstandingBalance::settled(),
    }
}
