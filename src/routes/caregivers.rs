use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Caregiver;
use crate::routes::required_text;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCaregiver {
    pub full_name: String,
    pub phone: Option<String>,
    pub user_id: Option<Uuid>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/caregivers", get(list_caregivers).post(create_caregiver))
        .route("/caregivers/:id", get(get_caregiver).delete(delete_caregiver))
        .with_state(pool)
}

async fn create_caregiver(
    State(pool): State<PgPool>,
    Json(body): Json<NewCaregiver>,
) -> Result<(StatusCode, Json<Caregiver>), ApiError> {
    let full_name = required_text("fullName", &body.full_name)?;
    let phone = body
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());

    let caregiver = sqlx::query_as::<_, Caregiver>(
        "INSERT INTO caregivers (full_name, phone, user_id) VALUES ($1, $2, $3)
         RETURNING id, user_id, full_name, phone, created_at",
    )
    .bind(&full_name)
    .bind(phone)
    .bind(body.user_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(caregiver_id = %caregiver.id, "🤝 caregiver created");
    Ok((StatusCode::CREATED, Json(caregiver)))
}

async fn list_caregivers(State(pool): State<PgPool>) -> Result<Json<Vec<Caregiver>>, ApiError> {
    let caregivers = sqlx::query_as::<_, Caregiver>(
        "SELECT id, user_id, full_name, phone, created_at FROM caregivers ORDER BY full_name ASC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(caregivers))
}

async fn get_caregiver(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Caregiver>, ApiError> {
    sqlx::query_as::<_, Caregiver>(
        "SELECT id, user_id, full_name, phone, created_at FROM caregivers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Caregiver"))
}

async fn delete_caregiver(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM caregivers WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    match result.rows_affected() {
        0 => Err(ApiError::not_found("Caregiver")),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}
