//! Bank transaction records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BankTransactionId, Cpf, Money, TherapistId};

/// Direction of a bank transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money in; the only kind the matcher considers
    Credit,
    /// Money out
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

/// A bank transaction imported from the therapist's account statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Unique identifier
    pub id: BankTransactionId,
    /// Account owner
    pub therapist_id: TherapistId,
    /// Amount in cents
    pub amount: Money,
    /// Statement description line
    pub description: String,
    /// Booking date
    pub date: NaiveDate,
    /// Sender name as reported by the bank, when available
    pub sender_name: Option<String>,
    /// Sender taxpayer document, when available
    pub sender_document: Option<Cpf>,
    /// Credit or debit
    pub transaction_type: TransactionType,
    /// When the transaction was imported
    pub imported_at: DateTime<Utc>,
}

impl BankTransaction {
    /// Creates a new credit transaction
    pub fn credit(
        therapist_id: TherapistId,
        amount: Money,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: BankTransactionId::new_v7(),
            therapist_id,
            amount,
            description: description.into(),
            date,
            sender_name: None,
            sender_document: None,
            transaction_type: TransactionType::Credit,
            imported_at: Utc::now(),
        }
    }

    /// Sets the sender name
    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Sets the sender document
    pub fn with_document(mut self, document: Cpf) -> Self {
        self.sender_document = Some(document);
        self
    }

    /// Marks the transaction as a debit
    pub fn as_debit(mut self) -> Self {
        self.transaction_type = TransactionType::Debit;
        self
    }

    /// True for incoming money
    pub fn is_credit(&self) -> bool {
        self.transaction_type == TransactionType::Credit
    }
}
