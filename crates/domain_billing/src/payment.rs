//! Payment records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BankTransactionId, BillingPeriodId, Money, PaymentId};

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Instant transfer (Pix)
    Pix,
    /// Regular bank transfer
    Transfer,
    /// Cash
    Cash,
    /// Credit or debit card
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "pix",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
        }
    }
}

/// A confirmed payment against a billing period
///
/// The amount is stored as given; any nonzero payment settles its period in
/// full. When the payment was confirmed from a reconciliation suggestion, the
/// claimed bank transaction is linked here, and that link is unique across
/// all payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// The settled billing period
    pub billing_period_id: BillingPeriodId,
    /// Paid amount, in cents
    pub amount: Money,
    /// How the patient paid
    pub method: PaymentMethod,
    /// Date the money arrived
    pub payment_date: NaiveDate,
    /// Free-form receipt/authorization reference
    pub reference_number: Option<String>,
    /// Bank transaction this payment claims, if reconciled
    pub bank_transaction_id: Option<BankTransactionId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment
    pub fn new(
        billing_period_id: BillingPeriodId,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            billing_period_id,
            amount,
            method,
            payment_date,
            reference_number: None,
            bank_transaction_id: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the receipt/authorization reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }

    /// Links the claimed bank transaction
    pub fn with_bank_transaction(mut self, transaction_id: BankTransactionId) -> Self {
        self.bank_transaction_id = Some(transaction_id);
        self
    }
}
