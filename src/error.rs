use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::compliance::ComplianceError;
use crate::models::ModelError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail),
            ApiError::Unprocessable(detail) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", detail)
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "❌ internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<ComplianceError> for ApiError {
    fn from(err: ComplianceError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Stored rows holding a value the enums don't know about.
impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if let Some(constraint) = db_err.constraint() {
                tracing::info!("🔒 Constraint violated: {}", constraint);
            }
            match db_err.code().as_deref() {
                Some("23505") => return ApiError::Conflict("Record already exists".into()),
                Some("23503") => {
                    return ApiError::Unprocessable("Referenced record does not exist".into())
                }
                Some("23514") => {
                    return ApiError::Unprocessable("Record violates a check constraint".into())
                }
                Some(code) => tracing::info!("ℹ️ SQLSTATE code: {}", code),
                None => {}
            }
        }
        ApiError::Internal(format!("DB error: {err}"))
    }
}
