//! Reconciliation DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{BankTransactionId, BillingPeriodId};
use domain_reconciliation::Match;

/// Query for potential matches
#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub limit: Option<usize>,
}

/// An advisory match suggestion
#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub transaction_id: BankTransactionId,
    pub billing_period_id: BillingPeriodId,
    pub confidence: f64,
    pub signals: Vec<&'static str>,
    pub suggested_amount_cents: i64,
    pub suggested_payment_date: NaiveDate,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            transaction_id: m.transaction_id,
            billing_period_id: m.billing_period_id,
            confidence: m.confidence,
            signals: m.signals.iter().map(|s| s.name()).collect(),
            suggested_amount_cents: m.suggestion.amount.cents(),
            suggested_payment_date: m.suggestion.payment_date,
        }
    }
}
