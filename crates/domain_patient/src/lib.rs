//! Patient Domain - patient records and billing eligibility
//!
//! A patient belongs to exactly one therapist and carries the two values the
//! billing engine is built on: the per-session price in cents and the
//! billing-start date. Sessions dated before the billing-start date are never
//! billable, no matter what the session source returns.

pub mod patient;
pub mod validation;
pub mod ports;
pub mod error;

pub use patient::Patient;
pub use validation::{PatientValidator, ValidationResult};
pub use ports::PatientPort;
pub use error::PatientError;
