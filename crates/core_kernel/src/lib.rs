//! Core Kernel - Foundational types and utilities for the practice billing system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money as integer centavos, free of floating-point arithmetic
//! - Billing month calendar types
//! - Strongly-typed identifiers and document value objects
//! - The port error type shared by all storage and provider adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod documents;
pub mod ports;

pub use money::{Money, MoneyError};
pub use temporal::{BillingMonth, TemporalError};
pub use identifiers::{
    TherapistId, PatientId, BillingPeriodId, PaymentId, BankTransactionId, InvoiceId,
};
pub use documents::{Cpf, DocumentError};
pub use ports::{DomainPort, PortError};
