use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Subscription, SubscriptionStatus, SubscriptionTier};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscription {
    pub patient_id: Uuid,
    pub tier: SubscriptionTier,
    pub started_on: NaiveDate,
    pub ends_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionQuery {
    pub patient_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct StatusChange {
    pub status: SubscriptionStatus,
}

const COLUMNS: &str = "id, patient_id, tier, status, started_on, ends_on, created_at";

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/subscriptions", get(list_subscriptions).post(create_subscription))
        .route(
            "/subscriptions/:id",
            get(get_subscription).delete(delete_subscription),
        )
        .route("/subscriptions/:id/status", put(change_status))
        .with_state(pool)
}

async fn fetch_subscription(pool: &PgPool, id: Uuid) -> Result<Subscription, ApiError> {
    sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Subscription"))
}

async fn create_subscription(
    State(pool): State<PgPool>,
    Json(body): Json<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    if body.ends_on.is_some_and(|end| end < body.started_on) {
        return Err(ApiError::BadRequest(
            "endsOn must not be before startedOn".into(),
        ));
    }

    let subscription = sqlx::query_as::<_, Subscription>(&format!(
        "INSERT INTO subscriptions (patient_id, tier, started_on, ends_on)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(body.patient_id)
    .bind(body.tier.as_str())
    .bind(body.started_on)
    .bind(body.ends_on)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        subscription_id = %subscription.id,
        tier = subscription.tier.as_str(),
        "💳 subscription created"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn list_subscriptions(
    State(pool): State<PgPool>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let subscriptions = sqlx::query_as::<_, Subscription>(&format!(
        "SELECT {COLUMNS}
         FROM subscriptions
         WHERE ($1::uuid IS NULL OR patient_id = $1)
         ORDER BY started_on DESC"
    ))
    .bind(query.patient_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(subscriptions))
}

async fn get_subscription(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Subscription>, ApiError> {
    fetch_subscription(&pool, id).await.map(Json)
}

async fn change_status(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusChange>,
) -> Result<Json<Subscription>, ApiError> {
    let current = fetch_subscription(&pool, id).await?;
    if !current.status.can_become(body.status) {
        return Err(ApiError::Conflict(format!(
            "a {} subscription cannot become {}",
            current.status.as_str(),
            body.status.as_str()
        )));
    }

    let updated = sqlx::query_as::<_, Subscription>(&format!(
        "UPDATE subscriptions SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(body.status.as_str())
    .fetch_one(&pool)
    .await?;

    tracing::info!(subscription_id = %id, status = body.status.as_str(), "💳 subscription status changed");
    Ok(Json(updated))
}

async fn delete_subscription(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    match result.rows_affected() {
        0 => Err(ApiError::not_found("Subscription")),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{lazy_pool, send};
    use serde_json::json;

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let (status, json) = send(
            routes(lazy_pool()),
            "POST",
            "/subscriptions",
            Some(json!({
                "patientId": Uuid::new_v4(),
                "tier": "standard",
                "startedOn": "2025-02-01",
                "endsOn": "2025-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "endsOn must not be before startedOn");
    }

    #[tokio::test]
    async fn unknown_tier_is_rejected() {
        let (status, _) = send(
            routes(lazy_pool()),
            "POST",
            "/subscriptions",
            Some(json!({
                "patientId": Uuid::new_v4(),
                "tier": "platinum",
                "startedOn": "2025-01-01"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let uri = format!("/subscriptions/{}/status", Uuid::new_v4());
        let (status, _) = send(
            routes(lazy_pool()),
            "PUT",
            &uri,
            Some(json!({ "status": "expired" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
