//! Patient entity

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Cpf, Money, PatientId, TherapistId};

/// A patient of the practice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    /// Unique identifier
    pub id: PatientId,
    /// Owning therapist
    pub therapist_id: TherapistId,
    /// Full name as used on invoices and payment matching
    pub name: String,
    /// Taxpayer document, when on file
    pub document: Option<Cpf>,
    /// Contact phone (digits, with country/area code)
    pub phone: Option<String>,
    /// Price charged per session, in cents
    pub session_price: Money,
    /// Sessions before this date are never billable
    pub billing_start_date: NaiveDate,
    /// Whether the patient is currently active
    pub is_active: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Creates a new active patient
    pub fn new(
        therapist_id: TherapistId,
        name: impl Into<String>,
        session_price: Money,
        billing_start_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PatientId::new_v7(),
            therapist_id,
            name: name.into(),
            document: None,
            phone: None,
            session_price,
            billing_start_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the taxpayer document
    pub fn with_document(mut self, document: Cpf) -> Self {
        self.document = Some(document);
        self
    }

    /// Sets the contact phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// True if a session on `date` is inside the patient's billable window
    pub fn is_billable_on(&self, date: NaiveDate) -> bool {
        date >= self.billing_start_date
    }

    /// Updates the session price
    pub fn set_session_price(&mut self, price: Money) {
        self.session_price = price;
        self.updated_at = Utc::now();
    }

    /// Deactivates the patient (soft delete)
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }
}
