//! Invoicing domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the invoicing domain
#[derive(Debug, Error)]
pub enum InvoicingError {
    /// Malformed or business-invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing invoice or billing period
    #[error("Not found: {0}")]
    NotFound(String),

    /// Issuance requires a paid billing period
    #[error("Invoice requires a paid billing period")]
    PeriodNotPaid,

    /// Issuance blocked by a missing or expired digital certificate
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// An issued invoice already exists for this period
    #[error("An invoice is already issued for this billing period")]
    DuplicateInvoice,

    /// The external provider failed; safe to retry after the upstream recovers
    #[error("Provider error: {0}")]
    Provider(String),

    /// Lost a uniqueness race; safe to retry after re-reading
    #[error("Concurrent modification: {0}")]
    ConcurrencyConflict(String),

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Port(PortError),
}

impl From<PortError> for InvoicingError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => {
                InvoicingError::NotFound(format!("{} {}", entity_type, id))
            }
            PortError::Conflict { message } => InvoicingError::ConcurrencyConflict(message),
            PortError::Validation { message } => InvoicingError::Validation(message),
            other => InvoicingError::Port(other),
        }
    }
}
