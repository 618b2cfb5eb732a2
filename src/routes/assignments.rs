use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Assignment;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub caregiver_id: Uuid,
    pub patient_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentQuery {
    pub patient_id: Option<Uuid>,
    pub caregiver_id: Option<Uuid>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/assignments", get(list_assignments).post(create_assignment))
        .route("/assignments/:id", delete(delete_assignment))
        .with_state(pool)
}

async fn create_assignment(
    State(pool): State<PgPool>,
    Json(body): Json<NewAssignment>,
) -> Result<(StatusCode, Json<Assignment>), ApiError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        "INSERT INTO assignments (caregiver_id, patient_id) VALUES ($1, $2)
         RETURNING id, caregiver_id, patient_id, created_at",
    )
    .bind(body.caregiver_id)
    .bind(body.patient_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        caregiver_id = %assignment.caregiver_id,
        patient_id = %assignment.patient_id,
        "🔗 caregiver assigned"
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn list_assignments(
    State(pool): State<PgPool>,
    Query(query): Query<AssignmentQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    let assignments = sqlx::query_as::<_, Assignment>(
        "SELECT id, caregiver_id, patient_id, created_at
         FROM assignments
         WHERE ($1::uuid IS NULL OR patient_id = $1)
           AND ($2::uuid IS NULL OR caregiver_id = $2)
         ORDER BY created_at ASC",
    )
    .bind(query.patient_id)
    .bind(query.caregiver_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(assignments))
}

async fn delete_assignment(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM assignments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Assignment"));
    }
    Ok(StatusCode::NO_CONTENT)
}
