//! Test data builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the fields they care about.

use chrono::NaiveDate;

use core_kernel::{Cpf, Money, TherapistId};
use domain_patient::Patient;
use domain_reconciliation::BankTransaction;

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for test patients
pub struct TestPatientBuilder {
    therapist_id: TherapistId,
    name: String,
    document: Option<Cpf>,
    session_price: Money,
    billing_start_date: NaiveDate,
}

impl TestPatientBuilder {
    /// Creates a builder with default values
    pub fn new(therapist_id: TherapistId) -> Self {
        Self {
            therapist_id,
            name: "Maria Silva".to_string(),
            document: None,
            session_price: MoneyFixtures::session_price(),
            billing_start_date: TemporalFixtures::billing_start(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_document(mut self, document: Cpf) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_session_price(mut self, price: Money) -> Self {
        self.session_price = price;
        self
    }

    pub fn with_billing_start(mut self, date: NaiveDate) -> Self {
        self.billing_start_date = date;
        self
    }

    pub fn build(self) -> Patient {
        let mut patient = Patient::new(
            self.therapist_id,
            self.name,
            self.session_price,
            self.billing_start_date,
        );
        patient.document = self.document;
        patient
    }
}

/// Builder for test bank transactions
pub struct TestTransactionBuilder {
    therapist_id: TherapistId,
    amount: Money,
    description: String,
    date: NaiveDate,
    sender_name: Option<String>,
    sender_document: Option<Cpf>,
}

impl TestTransactionBuilder {
    /// Creates a builder with default values
    pub fn new(therapist_id: TherapistId) -> Self {
        Self {
            therapist_id,
            amount: MoneyFixtures::three_session_total(),
            description: "PIX RECEBIDO".to_string(),
            date: TemporalFixtures::day(2025, 7, 1),
            sender_name: None,
            sender_document: None,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_sender(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    pub fn with_document(mut self, document: Cpf) -> Self {
        self.sender_document = Some(document);
        self
    }

    pub fn build(self) -> BankTransaction {
        let mut transaction = BankTransaction::credit(
            self.therapist_id,
            self.amount,
            self.description,
            self.date,
        );
        transaction.sender_name = self.sender_name;
        transaction.sender_document = self.sender_document;
        transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::DocumentFixtures;

    #[test]
    fn test_patient_builder_defaults() {
        let patient = TestPatientBuilder::new(TherapistId::new()).build();
        assert_eq!(patient.name, "Maria Silva");
        assert_eq!(patient.session_price.cents(), 18000);
        assert!(patient.document.is_none());
    }

    #[test]
    fn test_patient_builder_overrides() {
        let patient = TestPatientBuilder::new(TherapistId::new())
            .with_name("Joao Souza")
            .with_document(DocumentFixtures::cpf())
            .with_session_price(Money::from_cents(20000))
            .build();
        assert_eq!(patient.name, "Joao Souza");
        assert_eq!(patient.session_price.cents(), 20000);
        assert!(patient.document.is_some());
    }

    #[test]
    fn test_transaction_builder() {
        let transaction = TestTransactionBuilder::new(TherapistId::new())
            .with_description("PIX LV-1A2B3C")
            .with_sender("MARIA DA SILVA")
            .build();
        assert!(transaction.is_credit());
        assert_eq!(transaction.description, "PIX LV-1A2B3C");
        assert_eq!(transaction.sender_name.as_deref(), Some("MARIA DA SILVA"));
    }
}
