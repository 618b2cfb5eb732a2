use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::compliance::{self, ComplianceReport, Period};
use crate::error::ApiError;
use crate::routes::{logs, plans};

const DEFAULT_WINDOW_DAYS: u64 = 6;
const MAX_PERIOD_DAYS: u64 = 366;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/plans/:id/compliance", get(get_plan_compliance))
        .with_state(pool)
}

fn out_of_range(date: NaiveDate) -> ApiError {
    ApiError::BadRequest(format!("date range around {date} is out of bounds"))
}

/// Fills in a missing bound with a seven-day window; with no bounds at all,
/// the ISO week containing `today`.
fn resolve_period(query: &ComplianceQuery, today: NaiveDate) -> Result<Period, ApiError> {
    let window = Days::new(DEFAULT_WINDOW_DAYS);
    let (start, end) = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (
            start,
            start.checked_add_days(window).ok_or_else(|| out_of_range(start))?,
        ),
        (None, Some(end)) => (
            end.checked_sub_days(window).ok_or_else(|| out_of_range(end))?,
            end,
        ),
        (None, None) => {
            let monday = today
                .checked_sub_days(Days::new(today.weekday().num_days_from_monday().into()))
                .ok_or_else(|| out_of_range(today))?;
            let sunday = monday
                .checked_add_days(window)
                .ok_or_else(|| out_of_range(today))?;
            (monday, sunday)
        }
    };
    let period = Period::new(start, end)?;
    if period.len_days() > MAX_PERIOD_DAYS {
        return Err(ApiError::BadRequest(format!(
            "date range spans {} days; at most {MAX_PERIOD_DAYS} are allowed",
            period.len_days()
        )));
    }
    Ok(period)
}

async fn get_plan_compliance(
    State(pool): State<PgPool>,
    Path(plan_id): Path<Uuid>,
    Query(query): Query<ComplianceQuery>,
) -> Result<Json<ComplianceReport>, ApiError> {
    let period = resolve_period(&query, Utc::now().date_naive())?;
    let plan = plans::fetch_plan(&pool, plan_id).await?;

    let planned: Vec<_> = plans::fetch_entries(&pool, plan.id, period.start(), period.end())
        .await?
        .into_iter()
        .map(|record| record.entry)
        .collect();
    let logged: Vec<_> = logs::fetch_logs_in(&pool, plan.patient_id, &period)
        .await?
        .into_iter()
        .map(|record| record.entry)
        .collect();

    let report = compliance::aggregate(plan.id, period, &planned, &logged);
    tracing::info!(
        %plan_id,
        start = %period.start(),
        end = %period.end(),
        overall = report.overall_compliance,
        "📊 compliance computed"
    );
    Ok(Json(report))
}
