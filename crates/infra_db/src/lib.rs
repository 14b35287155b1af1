//! Database Infrastructure Layer
//!
//! PostgreSQL adapters for every domain port, built on SQLx with
//! runtime-checked queries. The billing uniqueness rules live in the schema
//! itself (partial unique indexes) and every mutating adapter wraps its
//! read-check-transition in a single transaction with row-level locks, so a
//! lost race always surfaces as a conflict instead of silent duplication.

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::billing::PostgresBillingAdapter;
pub use repositories::invoicing::PostgresInvoicingAdapter;
pub use repositories::patient::PostgresPatientAdapter;
pub use repositories::reconciliation::PostgresReconciliationAdapter;
pub use repositories::sessions::PostgresSessionSource;

/// Applies the embedded migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    tracing::info!("database migrations applied");
    Ok(())
}
