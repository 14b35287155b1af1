//! Patient domain ports
//!
//! The `PatientPort` trait defines the operations the rest of the system needs
//! from patient storage. Adapters implement it: PostgreSQL in `infra_db`, an
//! in-memory mock here for tests.

use async_trait::async_trait;

use core_kernel::{DomainPort, PatientId, PortError, TherapistId};

use crate::patient::Patient;

/// The port trait for patient storage
#[async_trait]
pub trait PatientPort: DomainPort {
    /// Retrieves a patient by ID
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError>;

    /// Lists a therapist's patients (active first, then by name)
    async fn list_patients(&self, therapist_id: TherapistId) -> Result<Vec<Patient>, PortError>;

    /// Persists a new patient
    async fn create_patient(&self, patient: &Patient) -> Result<(), PortError>;

    /// Updates an existing patient
    async fn update_patient(&self, patient: &Patient) -> Result<(), PortError>;
}

/// In-memory mock implementation of PatientPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of PatientPort
    #[derive(Debug, Default)]
    pub struct MockPatientPort {
        patients: Arc<RwLock<HashMap<PatientId, Patient>>>,
    }

    impl MockPatientPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with patients for testing
        pub async fn with_patients(patients: Vec<Patient>) -> Self {
            let port = Self::new();
            for patient in patients {
                port.patients.write().await.insert(patient.id, patient);
            }
            port
        }
    }

    impl DomainPort for MockPatientPort {}

    #[async_trait]
    impl PatientPort for MockPatientPort {
        async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
            self.patients
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Patient", id))
        }

        async fn list_patients(
            &self,
            therapist_id: TherapistId,
        ) -> Result<Vec<Patient>, PortError> {
            let patients = self.patients.read().await;
            let mut results: Vec<_> = patients
                .values()
                .filter(|p| p.therapist_id == therapist_id)
                .cloned()
                .collect();
            results.sort_by(|a, b| {
                b.is_active
                    .cmp(&a.is_active)
                    .then_with(|| a.name.cmp(&b.name))
            });
            Ok(results)
        }

        async fn create_patient(&self, patient: &Patient) -> Result<(), PortError> {
            let mut patients = self.patients.write().await;
            if patients.contains_key(&patient.id) {
                return Err(PortError::conflict(format!(
                    "patient {} already exists",
                    patient.id
                )));
            }
            patients.insert(patient.id, patient.clone());
            Ok(())
        }

        async fn update_patient(&self, patient: &Patient) -> Result<(), PortError> {
            let mut patients = self.patients.write().await;
            if !patients.contains_key(&patient.id) {
                return Err(PortError::not_found("Patient", patient.id));
            }
            patients.insert(patient.id, patient.clone());
            Ok(())
        }
    }
}
