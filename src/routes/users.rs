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
use crate::models::{Role, User};
use crate::routes::required_text;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user).delete(delete_user))
        .with_state(pool)
}

async fn create_user(
    State(pool): State<PgPool>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let email = required_text("email", &body.email)?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::BadRequest("email must contain '@'".into()));
    }
    let full_name = required_text("fullName", &body.full_name)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, full_name, role) VALUES ($1, $2, $3)
         RETURNING id, email, full_name, role, created_at",
    )
    .bind(&email)
    .bind(&full_name)
    .bind(body.role.as_str())
    .fetch_one(&pool)
    .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "👤 user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(pool): State<PgPool>) -> Result<Json<Vec<User>>, ApiError> {
    let users = sqlx::query_as::<_, User>(
        "SELECT id, email, full_name, role, created_at FROM users ORDER BY created_at ASC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let Some(user) = sqlx::query_as::<_, User>(
        "SELECT id, email, full_name, role, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    else {
        return Err(ApiError::not_found("User"));
    };

    Ok(Json(user))
}

async fn delete_user(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{lazy_pool, send};
    use serde_json::json;

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let (status, _) = send(
            routes(lazy_pool()),
            "POST",
            "/users",
            Some(json!({ "email": "a@b.org", "fullName": "Ada", "role": "superuser" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn email_without_at_sign_is_rejected() {
        let (status, json) = send(
            routes(lazy_pool()),
            "POST",
            "/users",
            Some(json!({ "email": "nobody", "fullName": "Ada", "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let (status, _) = send(routes(lazy_pool()), "GET", "/users/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
