//! Database error types and the mapping onto port errors

use core_kernel::PortError;
use thiserror::Error;

/// PostgreSQL unique-violation SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

/// Errors raised by the database layer itself (pool, migrations)
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Maps an SQLx error onto the unified port error
///
/// Unique violations become conflicts; that is how the schema's partial
/// unique indexes (duplicate period, double-spent bank transaction, second
/// issued invoice) reach the domain as typed race losses.
pub fn to_port_error(err: sqlx::Error, context: &str) -> PortError {
    match &err {
        sqlx::Error::RowNotFound => PortError::not_found(context, "requested row"),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            PortError::conflict(format!("{}: unique constraint violated", context))
        }
        sqlx::Error::PoolTimedOut => PortError::Timeout {
            operation: context.to_string(),
            duration_ms: 0,
        },
        _ => PortError::Internal {
            message: format!("{}: database failure", context),
            source: Some(Box::new(err)),
        },
    }
}

/// Internal error for rows that fail domain-type conversion
pub fn corrupt_row(context: &str, detail: impl std::fmt::Display) -> PortError {
    PortError::internal(format!("{}: corrupt row ({})", context, detail))
}
