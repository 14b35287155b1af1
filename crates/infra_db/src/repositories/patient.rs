//! Patient storage adapter

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{Cpf, DomainPort, Money, PatientId, PortError, TherapistId};
use domain_patient::{Patient, PatientPort};

use crate::error::{corrupt_row, to_port_error};

/// PostgreSQL implementation of `PatientPort`
#[derive(Debug, Clone)]
pub struct PostgresPatientAdapter {
    pool: PgPool,
}

impl PostgresPatientAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PatientRow {
    patient_id: Uuid,
    therapist_id: Uuid,
    full_name: String,
    document: Option<String>,
    phone: Option<String>,
    session_price_cents: i64,
    billing_start_date: NaiveDate,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PatientRow {
    fn into_patient(self) -> Result<Patient, PortError> {
        let document = self
            .document
            .map(|d| Cpf::parse(&d))
            .transpose()
            .map_err(|e| corrupt_row("patients", e))?;
        Ok(Patient {
            id: PatientId::from(self.patient_id),
            therapist_id: TherapistId::from(self.therapist_id),
            name: self.full_name,
            document,
            phone: self.phone,
            session_price: Money::from_cents(self.session_price_cents),
            billing_start_date: self.billing_start_date,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_PATIENT: &str = "SELECT patient_id, therapist_id, full_name, document, phone, \
     session_price_cents, billing_start_date, is_active, created_at, updated_at \
     FROM patients";

impl DomainPort for PostgresPatientAdapter {}

#[async_trait]
impl PatientPort for PostgresPatientAdapter {
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
        let row = sqlx::query_as::<_, PatientRow>(&format!(
            "{} WHERE patient_id = $1",
            SELECT_PATIENT
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "patients.get"))?;

        row.ok_or_else(|| PortError::not_found("Patient", id))?
            .into_patient()
    }

    async fn list_patients(&self, therapist_id: TherapistId) -> Result<Vec<Patient>, PortError> {
        let rows = sqlx::query_as::<_, PatientRow>(&format!(
            "{} WHERE therapist_id = $1 ORDER BY is_active DESC, full_name",
            SELECT_PATIENT
        ))
        .bind(therapist_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "patients.list"))?;

        rows.into_iter().map(PatientRow::into_patient).collect()
    }

    async fn create_patient(&self, patient: &Patient) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO patients (\
                 patient_id, therapist_id, full_name, document, phone, \
                 session_price_cents, billing_start_date, is_active, created_at, updated_at\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(patient.id.as_uuid())
        .bind(patient.therapist_id.as_uuid())
        .bind(&patient.name)
        .bind(patient.document.as_ref().map(|d| d.as_digits().to_string()))
        .bind(&patient.phone)
        .bind(patient.session_price.cents())
        .bind(patient.billing_start_date)
        .bind(patient.is_active)
        .bind(patient.created_at)
        .bind(patient.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "patients.create"))?;
        Ok(())
    }

    async fn update_patient(&self, patient: &Patient) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE patients SET \
                 full_name = $2, document = $3, phone = $4, session_price_cents = $5, \
                 billing_start_date = $6, is_active = $7, updated_at = $8 \
             WHERE patient_id = $1",
        )
        .bind(patient.id.as_uuid())
        .bind(&patient.name)
        .bind(patient.document.as_ref().map(|d| d.as_digits().to_string()))
        .bind(&patient.phone)
        .bind(patient.session_price.cents())
        .bind(patient.billing_start_date)
        .bind(patient.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| to_port_error(e, "patients.update"))?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("Patient", patient.id));
        }
        Ok(())
    }
}
