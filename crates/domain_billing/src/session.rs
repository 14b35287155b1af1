//! Session events and snapshots
//!
//! The session source is external (a calendar). At processing time the
//! qualifying events are frozen into `SessionSnapshot`s embedded in the
//! billing period; later edits to the calendar never change what was billed.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Status of a session as reported by the session source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Booked but not yet held
    Scheduled,
    /// Held as planned
    Attended,
    /// Cancelled; never billable
    Cancelled,
}

/// A session event as delivered by the external session source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Identifier of the event in the external calendar
    pub external_event_id: String,
    /// Calendar date of the session
    pub date: NaiveDate,
    /// Start time of the session
    pub time: NaiveTime,
    /// Current status in the source
    pub status: SessionStatus,
}

impl SessionEvent {
    /// True if the event counts towards a billing period
    pub fn is_billable(&self) -> bool {
        !matches!(self.status, SessionStatus::Cancelled)
    }
}

/// Immutable record of a billed session, captured at processing time
///
/// Billing disputes reference exactly what was billed, independent of any
/// later edit to the session source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Identifier of the originating calendar event
    pub external_event_id: String,
    /// Date the session was held
    pub date: NaiveDate,
    /// Start time of the session
    pub time: NaiveTime,
    /// Patient name at the time of billing
    pub patient_name: String,
}

impl SessionSnapshot {
    /// Freezes a session event into a snapshot
    pub fn capture(event: &SessionEvent, patient_name: impl Into<String>) -> Self {
        Self {
            external_event_id: event.external_event_id.clone(),
            date: event.date,
            time: event.time,
            patient_name: patient_name.into(),
        }
    }
}
