//! Patient handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Cpf, Money, PatientId};
use domain_patient::{Patient, PatientValidator};

use crate::auth::Claims;
use crate::dto::patients::{CreatePatientRequest, PatientResponse};
use crate::error::ApiError;
use crate::AppState;

/// Registers a patient for the authenticated therapist
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<PatientResponse>, ApiError> {
    request.validate()?;
    let therapist_id = claims.therapist_id()?;

    let document = request
        .document
        .as_deref()
        .map(Cpf::parse)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let mut patient = Patient::new(
        therapist_id,
        request.name,
        Money::from_cents(request.session_price_cents),
        request.billing_start_date,
    );
    patient.document = document;
    patient.phone = request.phone;

    let report = PatientValidator::validate(&patient);
    if !report.is_valid {
        return Err(ApiError::Validation(report.errors.join("; ")));
    }

    state.patients.create_patient(&patient).await.map_err(|e| {
        if e.is_conflict() {
            ApiError::Conflict(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    })?;
    Ok(Json(patient.into()))
}

/// The authenticated therapist's patients
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PatientResponse>>, ApiError> {
    let therapist_id = claims.therapist_id()?;
    let patients = state
        .patients
        .list_patients(therapist_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

/// Retrieves one patient
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatientResponse>, ApiError> {
    let therapist_id = claims.therapist_id()?;
    let patient = state
        .patients
        .get_patient(PatientId::from(id))
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ApiError::NotFound(e.to_string())
            } else {
                ApiError::Internal(e.to_string())
            }
        })?;
    if patient.therapist_id != therapist_id {
        return Err(ApiError::NotFound(format!("Patient {} not found", id)));
    }
    Ok(Json(patient.into()))
}
