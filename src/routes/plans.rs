use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{EntryColumns, LifestylePlan, PlanEntryRecord, PlanEntryRow, PlannedEntry};
use crate::routes::{non_blank, required_text};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    pub patient_id: Uuid,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanQuery {
    pub patient_id: Option<Uuid>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/:id", get(get_plan).delete(delete_plan))
        .route("/plans/:id/entries", get(list_entries).post(add_entry))
        .with_state(pool)
}

pub(crate) async fn fetch_plan(pool: &PgPool, id: Uuid) -> Result<LifestylePlan, ApiError> {
    sqlx::query_as::<_, LifestylePlan>(
        "SELECT id, patient_id, title, start_date, end_date, created_at
         FROM lifestyle_plans
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Plan"))
}

/// Planned entries for `plan_id` dated within `[start, end]`, by date then insertion order.
pub(crate) async fn fetch_entries(
    pool: &PgPool,
    plan_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PlanEntryRecord>, ApiError> {
    let rows = sqlx::query_as::<_, PlanEntryRow>(
        "SELECT id, plan_id, entry_date, kind, description, meal_type, calories,
                activity_type, calories_burned, duration_minutes
         FROM plan_entries
         WHERE plan_id = $1 AND entry_date BETWEEN $2 AND $3
         ORDER BY entry_date ASC, created_at ASC, id ASC",
    )
    .bind(plan_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| PlanEntryRecord::try_from(row).map_err(ApiError::from))
        .collect()
}

async fn create_plan(
    State(pool): State<PgPool>,
    Json(body): Json<NewPlan>,
) -> Result<(StatusCode, Json<LifestylePlan>), ApiError> {
    let title = required_text("title", &body.title)?;
    if body.start_date > body.end_date {
        return Err(ApiError::BadRequest(
            "startDate must not be after endDate".into(),
        ));
    }

    let plan = sqlx::query_as::<_, LifestylePlan>(
        "INSERT INTO lifestyle_plans (patient_id, title, start_date, end_date)
         VALUES ($1, $2, $3, $4)
         RETURNING id, patient_id, title, start_date, end_date, created_at",
    )
    .bind(body.patient_id)
    .bind(&title)
    .bind(body.start_date)
    .bind(body.end_date)
    .fetch_one(&pool)
    .await?;

    tracing::info!(plan_id = %plan.id, patient_id = %plan.patient_id, "📋 plan created");
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn list_plans(
    State(pool): State<PgPool>,
    Query(query): Query<PlanQuery>,
) -> Result<Json<Vec<LifestylePlan>>, ApiError> {
    let plans = sqlx::query_as::<_, LifestylePlan>(
        "SELECT id, patient_id, title, start_date, end_date, created_at
         FROM lifestyle_plans
         WHERE ($1::uuid IS NULL OR patient_id = $1)
         ORDER BY start_date DESC",
    )
    .bind(query.patient_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(plans))
}

async fn get_plan(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<LifestylePlan>, ApiError> {
    fetch_plan(&pool, id).await.map(Json)
}

async fn delete_plan(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM lifestyle_plans WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Plan"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_entries(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PlanEntryRecord>>, ApiError> {
    let plan = fetch_plan(&pool, id).await?;
    let entries = fetch_entries(&pool, plan.id, plan.start_date, plan.end_date).await?;
    Ok(Json(entries))
}

async fn add_entry(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(body): Json<PlannedEntry>,
) -> Result<(StatusCode, Json<PlanEntryRecord>), ApiError> {
    let description = non_blank("description", &body.description)?;
    let plan = fetch_plan(&pool, id).await?;
    if !(plan.start_date..=plan.end_date).contains(&body.date) {
        return Err(ApiError::BadRequest(format!(
            "date {} is outside the plan ({} to {})",
            body.date, plan.start_date, plan.end_date
        )));
    }

    let columns = EntryColumns::from_detail(description, &body.detail);
    let row = sqlx::query_as::<_, PlanEntryRow>(
        "INSERT INTO plan_entries
            (plan_id, entry_date, kind, description, meal_type, calories,
             activity_type, calories_burned, duration_minutes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id, plan_id, entry_date, kind, description, meal_type, calories,
                   activity_type, calories_burned, duration_minutes",
    )
    .bind(plan.id)
    .bind(body.date)
    .bind(&columns.kind)
    .bind(&columns.description)
    .bind(&columns.meal_type)
    .bind(columns.calories)
    .bind(&columns.activity_type)
    .bind(columns.calories_burned)
    .bind(columns.duration_minutes)
    .fetch_one(&pool)
    .await?;

    let record = PlanEntryRecord::try_from(row)?;
    tracing::info!(plan_id = %plan.id, kind = %record.entry.detail.kind(), "➕ plan entry added");
    Ok((StatusCode::CREATED, Json(record)))
}
