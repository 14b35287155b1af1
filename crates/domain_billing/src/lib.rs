//! Billing Domain - monthly billing-period lifecycle
//!
//! This crate implements the core billing engine: monthly billing periods are
//! born from session data, carry immutable session snapshots, and move through
//! a small, strictly-guarded state machine:
//!
//! ```text
//! (absent) --process_charges--> processed --record_payment--> paid
//!    ^                             |  ^                         |
//!    |                             |  +----cancel_payment-------+
//!    +------ void (terminal) <-----+        (last payment)
//! ```
//!
//! # Invariants
//!
//! - At most one non-void period exists per (therapist, patient, year, month)
//! - Session snapshots never change after the period is persisted
//! - A period with at least one payment can never be voided
//! - A patient's unpaid months settle oldest-first
//! - A bank transaction backs at most one payment

pub mod period;
pub mod session;
pub mod payment;
pub mod outstanding;
pub mod events;
pub mod ports;
pub mod services;
pub mod error;

pub use period::{BillingPeriod, PeriodStatus};
pub use session::{SessionEvent, SessionSnapshot, SessionStatus};
pub use payment::{Payment, PaymentMethod};
pub use outstanding::OutstandingBalance;
pub use events::BillingEvent;
pub use ports::{BillingPort, NotificationSink, SessionSource};
pub use services::{BillingPeriodService, BillingSummary, PaymentService, RecordPaymentRequest};
pub use error::BillingError;
