//! Port error vocabulary shared by every adapter
//!
//! Domain crates reach storage, the session calendar, and the invoice
//! provider through async port traits. The adapters behind those traits vary
//! (PostgreSQL, in-memory mocks, external HTTP), so they all report failures
//! through one `PortError` vocabulary that the domains can classify without
//! knowing which implementation answered.

use std::fmt;
use thiserror::Error;

/// Boxed cause attached to infrastructure failures
pub type ErrorSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure vocabulary of all port operations
#[derive(Debug, Error)]
pub enum PortError {
    /// No entity with this identity exists
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: String },

    /// The input failed an adapter-level check
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// A uniqueness rule or state precondition failed under concurrency
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The backing system could not be reached
    #[error("{service} is unavailable")]
    Unavailable {
        service: String,
        #[source]
        source: Option<ErrorSource>,
    },

    /// The call ran past its deadline
    #[error("{operation} exceeded its {duration_ms}ms deadline")]
    Timeout { operation: String, duration_ms: u64 },

    /// A fault inside the adapter itself, e.g. a row that fails conversion
    #[error("adapter failure: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<ErrorSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn unavailable(service: impl Into<String>) -> Self {
        PortError::Unavailable {
            service: service.into(),
            source: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same call may succeed without intervention
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Unavailable { .. } | PortError::Timeout { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker trait for all domain ports
///
/// Port traits extend this marker so trait objects can cross task boundaries.
pub trait DomainPort: Send + Sync + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let error = PortError::not_found("BillingPeriod", "PER-123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(!error.is_conflict());
        assert!(error.to_string().contains("BillingPeriod"));
        assert!(error.to_string().contains("PER-123"));
    }

    #[test]
    fn test_transient_errors_invite_retry() {
        let timeout = PortError::Timeout {
            operation: "generate_invoice".to_string(),
            duration_ms: 30_000,
        };
        let unavailable = PortError::unavailable("nfse-provider");

        assert!(timeout.is_transient());
        assert!(unavailable.is_transient());
        assert!(!PortError::validation("bad month").is_transient());
        assert!(!PortError::internal("corrupt row").is_transient());
    }

    #[test]
    fn test_conflict_is_terminal_for_the_attempt() {
        let conflict = PortError::conflict("period already processed");
        assert!(conflict.is_conflict());
        assert!(!conflict.is_transient());
    }
}
