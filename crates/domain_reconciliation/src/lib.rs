//! Reconciliation Domain - correlating bank transactions with billing periods
//!
//! The matcher is purely advisory: it scores unclaimed bank credits against
//! unpaid billing periods through independent signals (billing reference in
//! the description, sender CPF, exact/close amount, fuzzy sender name) and
//! proposes at most one candidate per transaction. Nothing here mutates
//! state; a human confirms a suggestion by recording the payment.

pub mod transaction;
pub mod normalize;
pub mod matcher;
pub mod ports;
pub mod services;
pub mod error;

pub use transaction::{BankTransaction, TransactionType};
pub use matcher::{
    Match, MatchSignal, MatchWeights, PaymentSuggestion, PeriodCandidate, TransactionMatcher,
};
pub use ports::ReconciliationPort;
pub use services::ReconciliationService;
pub use error::ReconciliationError;
