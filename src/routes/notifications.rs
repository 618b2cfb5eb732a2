use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Delivery, Notification, NotificationChannel, NotificationPreference};
use crate::routes::required_text;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: Uuid,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub unread_only: bool,
}

const COLUMNS: &str = "id, user_id, channel, title, body, read_at, created_at";

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/notifications", get(list_notifications).post(send_notification))
        .route("/notifications/:id", delete(delete_notification))
        .route("/notifications/:id/read", post(mark_read))
        .route(
            "/users/:id/notification-preferences",
            get(get_preferences).put(replace_preferences),
        )
        .with_state(pool)
}

/// Rejects a preference list naming the same channel twice.
fn check_unique_channels(preferences: &[NotificationPreference]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for pref in preferences {
        if !seen.insert(pref.channel.as_str()) {
            return Err(ApiError::BadRequest(format!(
                "channel {} listed more than once",
                pref.channel
            )));
        }
    }
    Ok(())
}

async fn send_notification(
    State(pool): State<PgPool>,
    Json(body): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let title = required_text("title", &body.title)?;
    let message = required_text("body", &body.body)?;

    let preference: Option<Delivery> = sqlx::query_scalar::<_, String>(
        "SELECT delivery FROM notification_preferences WHERE user_id = $1 AND channel = $2",
    )
    .bind(body.user_id)
    .bind(body.channel.as_str())
    .fetch_optional(&pool)
    .await?
    .map(Delivery::try_from)
    .transpose()?;

    if !Delivery::accepts(preference) {
        return Err(ApiError::Unprocessable(format!(
            "user has muted {} notifications",
            body.channel
        )));
    }

    let notification = sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (user_id, channel, title, body)
         VALUES ($1, $2, $3, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(body.user_id)
    .bind(body.channel.as_str())
    .bind(&title)
    .bind(&message)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        notification_id = %notification.id,
        channel = %notification.channel,
        "🔔 notification queued"
    );
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn list_notifications(
    State(pool): State<PgPool>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = sqlx::query_as::<_, Notification>(&format!(
        "SELECT {COLUMNS}
         FROM notifications
         WHERE ($1::uuid IS NULL OR user_id = $1)
           AND (NOT $2 OR read_at IS NULL)
         ORDER BY created_at DESC"
    ))
    .bind(query.user_id)
    .bind(query.unread_only)
    .fetch_all(&pool)
    .await?;

    Ok(Json(notifications))
}

async fn mark_read(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET read_at = COALESCE(read_at, now())
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Notification"))
}

async fn delete_notification(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    match result.rows_affected() {
        0 => Err(ApiError::not_found("Notification")),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

async fn get_preferences(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<NotificationPreference>>, ApiError> {
    let preferences = sqlx::query_as::<_, NotificationPreference>(
        "SELECT channel, delivery FROM notification_preferences WHERE user_id = $1 ORDER BY channel",
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(preferences))
}

async fn replace_preferences(
    State(pool): State<PgPool>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<Vec<NotificationPreference>>,
) -> Result<Json<Vec<NotificationPreference>>, ApiError> {
    check_unique_channels(&body)?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM notification_preferences WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    for pref in &body {
        sqlx::query(
            "INSERT INTO notification_preferences (user_id, channel, delivery) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(pref.channel.as_str())
        .bind(pref.delivery.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(%user_id, channels = body.len(), "🔔 notification preferences replaced");
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{lazy_pool, send};
    use serde_json::json;

    #[test]
    fn duplicate_channels_are_rejected() {
        let prefs = vec![
            NotificationPreference {
                channel: NotificationChannel::Email,
                delivery: Delivery::Immediate,
            },
            NotificationPreference {
                channel: NotificationChannel::Email,
                delivery: Delivery::Muted,
            },
        ];
        let err = check_unique_channels(&prefs).unwrap_err();
        assert!(matches!(
            err,
            ApiError::BadRequest(ref msg) if msg == "channel email listed more than once"
        ));
    }

    #[tokio::test]
    async fn duplicate_channels_fail_before_any_write() {
        let uri = format!("/users/{}/notification-preferences", Uuid::new_v4());
        let (status, _) = send(
            routes(lazy_pool()),
            "PUT",
            &uri,
            Some(json!([
                { "channel": "push", "delivery": "immediate" },
                { "channel": "push", "delivery": "muted" }
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_delivery_mode_is_rejected() {
        let uri = format!("/users/{}/notification-preferences", Uuid::new_v4());
        let (status, _) = send(
            routes(lazy_pool()),
            "PUT",
            &uri,
            Some(json!([{ "channel": "sms", "delivery": "hourly" }])),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn blank_body_is_rejected() {
        let (status, json) = send(
            routes(lazy_pool()),
            "POST",
            "/notifications",
            Some(json!({
                "userId": Uuid::new_v4(),
                "channel": "in_app",
                "title": "Plan updated",
                "body": "   "
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["message"], "body must not be blank");
    }
}
