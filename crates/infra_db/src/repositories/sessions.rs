//! Session source adapter
//!
//! Reads the `calendar_sessions` table that the external calendar sync keeps
//! up to date. This adapter is the engine's view of the session source; the
//! ingestion job that fills the table lives outside this system.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

use core_kernel::{DomainPort, PatientId, PortError};
use domain_billing::{SessionEvent, SessionSource, SessionStatus};

use crate::error::{corrupt_row, to_port_error};

/// PostgreSQL implementation of `SessionSource`
#[derive(Debug, Clone)]
pub struct PostgresSessionSource {
    pool: PgPool,
}

impl PostgresSessionSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    event_id: String,
    session_date: NaiveDate,
    session_time: NaiveTime,
    status: String,
}

impl SessionRow {
    fn into_event(self) -> Result<SessionEvent, PortError> {
        let status = match self.status.as_str() {
            "scheduled" => SessionStatus::Scheduled,
            "attended" => SessionStatus::Attended,
            "cancelled" => SessionStatus::Cancelled,
            other => {
                return Err(corrupt_row(
                    "calendar_sessions",
                    format!("unknown status '{}'", other),
                ))
            }
        };
        Ok(SessionEvent {
            external_event_id: self.event_id,
            date: self.session_date,
            time: self.session_time,
            status,
        })
    }
}

impl DomainPort for PostgresSessionSource {}

#[async_trait]
impl SessionSource for PostgresSessionSource {
    async fn get_sessions(
        &self,
        patient_id: PatientId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SessionEvent>, PortError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT event_id, session_date, session_time, status \
             FROM calendar_sessions \
             WHERE patient_id = $1 AND session_date BETWEEN $2 AND $3 \
             ORDER BY session_date, session_time",
        )
        .bind(patient_id.as_uuid())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "calendar_sessions.range"))?;

        rows.into_iter().map(SessionRow::into_event).collect()
    }
}
