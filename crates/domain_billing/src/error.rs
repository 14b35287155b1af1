//! Billing domain errors

use core_kernel::{BillingMonth, MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Malformed or business-invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// A non-void period already exists for the identity key
    #[error("Charges already processed for {month}; void the existing period to reprocess")]
    AlreadyProcessed { month: BillingMonth },

    /// Missing period or payment (or the period is already void)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Void blocked by an existing payment
    #[error("Billing period has payments and cannot be voided")]
    PeriodHasPayment,

    /// Payment blocked by an older unpaid period
    #[error("An earlier billing period ({oldest}) is still unpaid and must be settled first")]
    ChronologyViolation { oldest: BillingMonth },

    /// Lost a uniqueness or state race; safe to retry after re-reading
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// Money arithmetic failure
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Underlying storage or collaborator failure
    #[error("Storage error: {0}")]
    Port(PortError),
}

impl From<PortError> for BillingError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                BillingError::NotFound(format!("{} {}", entity_type, id))
            }
            PortError::Conflict { message } => BillingError::ConcurrencyConflict(message),
            PortError::Validation { message } => BillingError::Validation(message),
            other => BillingError::Port(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_maps_to_not_found() {
        let err: BillingError = PortError::not_found("BillingPeriod", "abc").into();
        assert!(matches!(err, BillingError::NotFound(_)));
    }

    #[test]
    fn test_port_conflict_maps_to_concurrency_conflict() {
        let err: BillingError = PortError::conflict("lost the race").into();
        assert!(matches!(err, BillingError::ConcurrencyConflict(_)));
    }
}
