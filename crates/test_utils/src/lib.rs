//! Test Utilities
//!
//! Shared fixtures, builders, and generators for the workspace test suite.
//! Everything here targets the in-memory mock adapters; no database or
//! network is required to run any test that uses this crate.

pub mod fixtures;
pub mod builders;
pub mod generators;

pub use builders::{TestPatientBuilder, TestTransactionBuilder};
pub use fixtures::{DocumentFixtures, MoneyFixtures, TemporalFixtures};
