//! Patient DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::PatientId;
use domain_patient::Patient;

/// Request to register a patient
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePatientRequest {
    #[validate(length(min = 2, message = "name must have at least 2 characters"))]
    pub name: String,
    /// CPF, bare digits or punctuated
    pub document: Option<String>,
    pub phone: Option<String>,
    #[validate(range(min = 1))]
    pub session_price_cents: i64,
    pub billing_start_date: NaiveDate,
}

/// Patient representation
#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub id: PatientId,
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub session_price_cents: i64,
    pub billing_start_date: NaiveDate,
    pub is_active: bool,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name,
            document: patient.document.map(|d| d.formatted()),
            phone: patient.phone,
            session_price_cents: patient.session_price.cents(),
            billing_start_date: patient.billing_start_date,
            is_active: patient.is_active,
        }
    }
}
