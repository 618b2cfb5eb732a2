use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Patient;
use crate::routes::required_text;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route("/patients/:id", get(get_patient).delete(delete_patient))
        .with_state(pool)
}

async fn create_patient(
    State(pool): State<PgPool>,
    Json(body): Json<NewPatient>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let full_name = required_text("fullName", &body.full_name)?;
    if body
        .date_of_birth
        .is_some_and(|dob| dob > Utc::now().date_naive())
    {
        return Err(ApiError::BadRequest("dateOfBirth is in the future".into()));
    }

    let patient = sqlx::query_as::<_, Patient>(
        "INSERT INTO patients (full_name, date_of_birth, user_id) VALUES ($1, $2, $3)
         RETURNING id, user_id, full_name, date_of_birth, created_at",
    )
    .bind(&full_name)
    .bind(body.date_of_birth)
    .bind(body.user_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(patient_id = %patient.id, "🩺 patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn list_patients(State(pool): State<PgPool>) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = sqlx::query_as::<_, Patient>(
        "SELECT id, user_id, full_name, date_of_birth, created_at
         FROM patients
         ORDER BY full_name ASC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(patients))
}

async fn get_patient(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let Some(patient) = sqlx::query_as::<_, Patient>(
        "SELECT id, user_id, full_name, date_of_birth, created_at FROM patients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    else {
        return Err(ApiError::not_found("Patient"));
    };

    Ok(Json(patient))
}

async fn delete_patient(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Patient"));
    }
    tracing::info!(patient_id = %id, "🗑️ patient deleted");
    Ok(StatusCode::NO_CONTENT)
}
