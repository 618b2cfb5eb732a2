use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::compliance::Period;
use crate::error::ApiError;
use crate::models::{EntryColumns, LoggedEntry, LoggedEntryRecord, LoggedEntryRow};
use crate::routes::non_blank;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/patients/:id/logs", get(list_logs).post(log_entry))
        .with_state(pool)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Half-open UTC timestamp bounds covering every day of `period`.
fn timestamp_bounds(period: &Period) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
    let from = start_of_day(period.start());
    let until = period.end().checked_add_days(Days::new(1)).map(start_of_day);
    (from, until)
}

async fn query_logs(
    pool: &PgPool,
    patient_id: Uuid,
    from: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<Vec<LoggedEntryRecord>, ApiError> {
    let rows = sqlx::query_as::<_, LoggedEntryRow>(
        "SELECT id, patient_id, logged_at, kind, description, meal_type, calories,
                activity_type, calories_burned, duration_minutes
         FROM logged_entries
         WHERE patient_id = $1
           AND ($2::timestamptz IS NULL OR logged_at >= $2)
           AND ($3::timestamptz IS NULL OR logged_at < $3)
         ORDER BY logged_at ASC, created_at ASC",
    )
    .bind(patient_id)
    .bind(from)
    .bind(until)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| LoggedEntryRecord::try_from(row).map_err(ApiError::from))
        .collect()
}

/// Logged entries for `patient_id` whose UTC day falls inside `period`.
pub(crate) async fn fetch_logs_in(
    pool: &PgPool,
    patient_id: Uuid,
    period: &Period,
) -> Result<Vec<LoggedEntryRecord>, ApiError> {
    let (from, until) = timestamp_bounds(period);
    query_logs(pool, patient_id, Some(from), until).await
}

async fn ensure_patient(pool: &PgPool, patient_id: Uuid) -> Result<(), ApiError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE id = $1)")
        .bind(patient_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ApiError::not_found("Patient"));
    }
    Ok(())
}

async fn list_logs(
    State(pool): State<PgPool>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<LoggedEntryRecord>>, ApiError> {
    let (from, until) = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => {
            let (from, until) = timestamp_bounds(&Period::new(start, end)?);
            (Some(from), until)
        }
        (start, end) => (
            start.map(start_of_day),
            end.and_then(|d| d.checked_add_days(Days::new(1)))
                .map(start_of_day),
        ),
    };

    ensure_patient(&pool, patient_id).await?;
    Ok(Json(query_logs(&pool, patient_id, from, until).await?))
}

async fn log_entry(
    State(pool): State<PgPool>,
    Path(patient_id): Path<Uuid>,
    Json(body): Json<LoggedEntry>,
) -> Result<(StatusCode, Json<LoggedEntryRecord>), ApiError> {
    let description = non_blank("description", &body.description)?;
    let columns = EntryColumns::from_detail(description, &body.detail);

    let row = sqlx::query_as::<_, LoggedEntryRow>(
        "INSERT INTO logged_entries
            (patient_id, logged_at, kind, description, meal_type, calories,
             activity_type, calories_burned, duration_minutes)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING id, patient_id, logged_at, kind, description, meal_type, calories,
                   activity_type, calories_burned, duration_minutes",
    )
    .bind(patient_id)
    .bind(body.logged_at)
    .bind(&columns.kind)
    .bind(&columns.description)
    .bind(&columns.meal_type)
    .bind(columns.calories)
    .bind(&columns.activity_type)
    .bind(columns.calories_burned)
    .bind(columns.duration_minutes)
    .fetch_one(&pool)
    .await?;

    let record = LoggedEntryRecord::try_from(row)?;
    tracing::info!(%patient_id, kind = %record.entry.detail.kind(), "📝 entry logged");
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{lazy_pool, send};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn bounds_cover_whole_days() {
        let period = Period::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        )
        .unwrap();
        let (from, until) = timestamp_bounds(&period);
        assert_eq!(from, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(until, Some(Utc.with_ymd_and_hms(2025, 1, 3, 0, 0, 0).unwrap()));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let uri = format!(
            "/patients/{}/logs?startDate=2025-02-01&endDate=2025-01-01",
            Uuid::new_v4()
        );
        let (status, json) = send(routes(lazy_pool()), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn log_without_timestamp_is_rejected() {
        let uri = format!("/patients/{}/logs", Uuid::new_v4());
        let (status, _) = send(
            routes(lazy_pool()),
            "POST",
            &uri,
            Some(json!({ "description": "Oatmeal breakfast", "kind": "meal" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn blank_log_description_is_rejected() {
        let uri = format!("/patients/{}/logs", Uuid::new_v4());
        let (status, _) = send(
            routes(lazy_pool()),
            "POST",
            &uri,
            Some(json!({
                "loggedAt": "2025-01-01T08:00:00Z",
                "description": " ",
                "kind": "meal"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
