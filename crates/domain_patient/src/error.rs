//! Patient domain errors

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur in the patient domain
#[derive(Debug, Error)]
pub enum PatientError {
    /// Patient not found
    #[error("Patient not found: {0}")]
    NotFound(String),

    /// Validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage-level failure
    #[error("Storage error: {0}")]
    Port(#[from] PortError),
}
