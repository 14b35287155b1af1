//! Reconciliation domain ports
//!
//! The matcher consumes a read model: unclaimed bank credits in a date range
//! and the unpaid billing periods that could explain them. Claimed
//! transactions (those linked to a confirmed payment) never appear in the
//! unclaimed set.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{BillingMonth, DomainPort, PortError, TherapistId};

use crate::matcher::PeriodCandidate;
use crate::transaction::BankTransaction;

/// Read-model port feeding the matcher
#[async_trait]
pub trait ReconciliationPort: DomainPort {
    /// Bank transactions in the inclusive range that no payment has claimed
    async fn unclaimed_transactions(
        &self,
        therapist_id: TherapistId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<BankTransaction>, PortError>;

    /// Unpaid (processed) periods from `since` onwards, as match candidates
    async fn unpaid_candidates(
        &self,
        therapist_id: TherapistId,
        since: BillingMonth,
    ) -> Result<Vec<PeriodCandidate>, PortError>;
}

/// In-memory mock implementation for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::BankTransactionId;

    /// In-memory reconciliation read model
    #[derive(Debug, Default)]
    pub struct MockReconciliationPort {
        transactions: Arc<RwLock<Vec<BankTransaction>>>,
        claimed: Arc<RwLock<HashSet<BankTransactionId>>>,
        candidates: Arc<RwLock<Vec<PeriodCandidate>>>,
    }

    impl MockReconciliationPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds an imported bank transaction
        pub async fn add_transaction(&self, transaction: BankTransaction) {
            self.transactions.write().await.push(transaction);
        }

        /// Marks a transaction as claimed by a confirmed payment
        pub async fn claim_transaction(&self, id: BankTransactionId) {
            self.claimed.write().await.insert(id);
        }

        /// Adds an unpaid period candidate
        pub async fn add_candidate(&self, candidate: PeriodCandidate) {
            self.candidates.write().await.push(candidate);
        }

        /// Removes a candidate once its period is settled
        pub async fn remove_candidate(&self, id: core_kernel::BillingPeriodId) {
            self.candidates
                .write()
                .await
                .retain(|c| c.billing_period_id != id);
        }
    }

    impl DomainPort for MockReconciliationPort {}

    #[async_trait]
    impl ReconciliationPort for MockReconciliationPort {
        async fn unclaimed_transactions(
            &self,
            therapist_id: TherapistId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<BankTransaction>, PortError> {
            let claimed = self.claimed.read().await;
            Ok(self
                .transactions
                .read()
                .await
                .iter()
                .filter(|t| {
                    t.therapist_id == therapist_id
                        && t.date >= start
                        && t.date <= end
                        && !claimed.contains(&t.id)
                })
                .cloned()
                .collect())
        }

        async fn unpaid_candidates(
            &self,
            therapist_id: TherapistId,
            since: BillingMonth,
        ) -> Result<Vec<PeriodCandidate>, PortError> {
            Ok(self
                .candidates
                .read()
                .await
                .iter()
                .filter(|c| c.therapist_id == therapist_id && c.month >= since)
                .cloned()
                .collect())
        }
    }
}
