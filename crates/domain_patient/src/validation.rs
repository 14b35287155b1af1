//! Patient validation rules
//!
//! # Validation Rules
//!
//! - Name must be present and at least two characters
//! - Session price must be strictly positive
//! - Phone, when present, must contain at least 10 digits
//! - Billing-start date must not be absurdly far in the future

use chrono::{Duration, Utc};

use crate::patient::Patient;

/// Result of patient validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the patient is valid
    pub is_valid: bool,
    /// List of validation errors
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal issues)
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a successful validation result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Adds an error to the result
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    /// Adds a warning to the result
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

/// Validator for patient records
pub struct PatientValidator;

impl PatientValidator {
    /// Validates a patient record
    pub fn validate(patient: &Patient) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if patient.name.trim().len() < 2 {
            result.add_error("Patient name must have at least 2 characters");
        }

        if !patient.session_price.is_positive() {
            result.add_error("Session price must be positive");
        }

        if let Some(ref phone) = patient.phone {
            let digit_count = phone.chars().filter(|c| c.is_ascii_digit()).count();
            if digit_count < 10 {
                result.add_error("Phone must contain at least 10 digits");
            }
        }

        if patient.document.is_none() {
            result.add_warning("Patient has no CPF on file; document matching will be unavailable");
        }

        let horizon = (Utc::now() + Duration::days(366)).date_naive();
        if patient.billing_start_date > horizon {
            result.add_error("Billing start date is more than a year in the future");
        }

        result
    }
}
