//! Reconciliation application service

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use core_kernel::{BillingMonth, TherapistId};

use crate::error::ReconciliationError;
use crate::matcher::{Match, TransactionMatcher};
use crate::ports::ReconciliationPort;

/// Read-only service producing advisory payment suggestions
pub struct ReconciliationService {
    port: Arc<dyn ReconciliationPort>,
    matcher: TransactionMatcher,
}

impl ReconciliationService {
    pub fn new(port: Arc<dyn ReconciliationPort>) -> Self {
        Self {
            port,
            matcher: TransactionMatcher::new(),
        }
    }

    /// Replaces the default matcher configuration
    pub fn with_matcher(mut self, matcher: TransactionMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Correlates unclaimed bank credits in the range against unpaid periods
    ///
    /// Candidate periods are searched back `lookback_months` from the range
    /// end. The result is ordered by confidence and truncated to `limit`;
    /// each transaction appears at most once, with its single best candidate.
    /// This never mutates state; suggestions become payments only through an
    /// explicit, human-confirmed `record_payment` call.
    pub async fn find_potential_matches(
        &self,
        therapist_id: TherapistId,
        range_start: NaiveDate,
        range_end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Match>, ReconciliationError> {
        if range_start > range_end {
            return Err(ReconciliationError::Validation(format!(
                "range start {} is after range end {}",
                range_start, range_end
            )));
        }
        if limit == 0 {
            return Err(ReconciliationError::Validation(
                "limit must be at least 1".to_string(),
            ));
        }

        let transactions = self
            .port
            .unclaimed_transactions(therapist_id, range_start, range_end)
            .await?;
        let since = BillingMonth::from_date(range_end).minus_months(self.matcher.lookback_months);
        let candidates = self.port.unpaid_candidates(therapist_id, since).await?;

        debug!(
            transactions = transactions.len(),
            candidates = candidates.len(),
            %since,
            "scoring potential matches"
        );

        let mut matches = self.matcher.best_matches(&transactions, &candidates);
        matches.truncate(limit);
        Ok(matches)
    }
}
