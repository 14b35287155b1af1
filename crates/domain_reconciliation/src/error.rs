//! Reconciliation domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the reconciliation domain
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// Malformed input (inverted range, zero limit)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Port(#[from] PortError),
}
