use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Document;
use crate::routes::required_text;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub patient_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub title: String,
    pub file_name: String,
    pub content_type: String,
    pub storage_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub patient_id: Option<Uuid>,
}

pub fn routes(pool: PgPool) -> Router {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route("/documents/:id", get(get_document).delete(delete_document))
        .with_state(pool)
}

/// `type/subtype`, both halves non-empty.
fn is_media_type(value: &str) -> bool {
    matches!(value.split_once('/'), Some((kind, sub)) if !kind.is_empty() && !sub.is_empty())
}

async fn create_document(
    State(pool): State<PgPool>,
    Json(body): Json<NewDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let title = required_text("title", &body.title)?;
    let file_name = required_text("fileName", &body.file_name)?;
    let storage_url = required_text("storageUrl", &body.storage_url)?;
    let content_type = body.content_type.trim().to_lowercase();
    if !is_media_type(&content_type) {
        return Err(ApiError::BadRequest(format!(
            "contentType `{}` is not a media type",
            body.content_type
        )));
    }

    let document = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (patient_id, uploaded_by, title, file_name, content_type, storage_url)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, patient_id, uploaded_by, title, file_name, content_type, storage_url, created_at",
    )
    .bind(body.patient_id)
    .bind(body.uploaded_by)
    .bind(&title)
    .bind(&file_name)
    .bind(&content_type)
    .bind(&storage_url)
    .fetch_one(&pool)
    .await?;

    tracing::info!(document_id = %document.id, patient_id = %document.patient_id, "📄 document recorded");
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list_documents(
    State(pool): State<PgPool>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let documents = sqlx::query_as::<_, Document>(
        "SELECT id, patient_id, uploaded_by, title, file_name, content_type, storage_url, created_at
         FROM documents
         WHERE ($1::uuid IS NULL OR patient_id = $1)
         ORDER BY created_at DESC",
    )
    .bind(query.patient_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}

async fn get_document(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    sqlx::query_as::<_, Document>(
        "SELECT id, patient_id, uploaded_by, title, file_name, content_type, storage_url, created_at
         FROM documents
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Document"))
}

async fn delete_document(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    match result.rows_affected() {
        0 => Err(ApiError::not_found("Document")),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}
