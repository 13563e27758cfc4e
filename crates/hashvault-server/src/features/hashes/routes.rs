//! Hash API routes
//!
//! - `GET /api/v1/hashes` - List hashes with pagination and an optional source filter
//! - `GET /api/v1/hashes/:hash` - Look up one hash
//! - `POST /api/v1/hashes` - Add one hash
//! - `GET /api/v1/stats` - Count of stored hashes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use super::{
    commands::{CreateHashCommand, CreateHashError},
    queries::{GetHashError, GetHashQuery, ListHashesError, ListHashesQuery},
};
use crate::api::response::{ApiResponse, ApiResult, ErrorResponse};
use crate::db::HashRepository;

pub type RepoState = Arc<dyn HashRepository>;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn hashes_routes() -> Router<RepoState> {
    Router::new()
        .route("/", get(list_hashes).post(create_hash))
        .route("/:hash", get(get_hash))
}

pub fn stats_routes() -> Router<RepoState> {
    Router::new().route("/", get(get_stats))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Add a hash
///
/// # Response
///
/// - `201 Created` - Hash stored
/// - `400 Bad Request` - Not a 32-character hex string
/// - `409 Conflict` - Hash already stored
#[tracing::instrument(skip(repo, command), fields(md5_hash = %command.md5_hash))]
async fn create_hash(
    State(repo): State<RepoState>,
    Json(command): Json<CreateHashCommand>,
) -> Result<Response, HashApiError> {
    let record = super::commands::create::handle(repo.as_ref(), command).await?;

    tracing::info!(id = record.id, md5_hash = %record.md5_hash, "Hash created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Look up one hash; the path segment is matched case-insensitively
async fn get_hash(
    State(repo): State<RepoState>,
    Path(hash): Path<String>,
) -> Result<Response, HashApiError> {
    let record = super::queries::get::handle(repo.as_ref(), GetHashQuery { md5_hash: hash }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(record))).into_response())
}

/// `GET /api/v1/hashes?page=1&per_page=20&source_file=VirusShare_00000`
#[tracing::instrument(
    skip(repo, query),
    fields(page = ?query.page, per_page = ?query.per_page)
)]
async fn list_hashes(
    State(repo): State<RepoState>,
    Query(query): Query<ListHashesQuery>,
) -> Result<Response, HashApiError> {
    let response = super::queries::list::handle(repo.as_ref(), query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Hashes listed via API"
    );

    let meta = json!({ "pagination": response.pagination });
    Ok(
        (StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta)))
            .into_response(),
    )
}

async fn get_stats(State(repo): State<RepoState>) -> ApiResult<Response> {
    let stats = super::queries::stats::handle(repo.as_ref()).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(stats))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
enum HashApiError {
    #[error(transparent)]
    Create(#[from] CreateHashError),
    #[error(transparent)]
    Get(#[from] GetHashError),
    #[error(transparent)]
    List(#[from] ListHashesError),
}

fn internal_error(context: &str, err: &dyn std::fmt::Display) -> Response {
    tracing::error!("Database error during {}: {}", context, err);
    let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
}

impl IntoResponse for HashApiError {
    fn into_response(self) -> Response {
        match &self {
            HashApiError::Create(CreateHashError::InvalidHash(_))
            | HashApiError::Get(GetHashError::InvalidHash(_))
            | HashApiError::List(ListHashesError::InvalidPage)
            | HashApiError::List(ListHashesError::InvalidPerPage)
            | HashApiError::List(ListHashesError::PageOutOfRange) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            HashApiError::Create(CreateHashError::Duplicate(msg)) => {
                let error = ErrorResponse::new("CONFLICT", msg.clone());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            HashApiError::Get(GetHashError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            HashApiError::Create(CreateHashError::Database(e)) => internal_error("hash creation", e),
            HashApiError::Get(GetHashError::Database(e)) => internal_error("hash lookup", e),
            HashApiError::List(ListHashesError::Database(e)) => internal_error("hash listing", e),
        }
    }
}
