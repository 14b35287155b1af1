//! Port adapter implementations, one per domain

pub mod patient;
pub mod sessions;
pub mod billing;
pub mod reconciliation;
pub mod invoicing;
