//! API response types
//!
//! Success bodies are wrapped in [`ApiResponse`], failures in [`ErrorResponse`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::DbError;

/// Standard success response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn success_with_meta(data: T, meta: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Pagination metadata for list responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page,
            per_page,
            total,
            pages,
            has_next: page < pages,
            has_prev: page > 1,
        }
    }
}

/// Handler error that renders as an [`ErrorResponse`]
#[derive(Debug)]
pub enum AppError {
    Conflict(String),
    Database(DbError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(msg) => AppError::Conflict(msg),
            other => AppError::Database(other),
        }
    }
}

pub type ApiResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_meta_rounds_up_pages() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.pages, 3);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let last = PaginationMeta::new(3, 20, 41);
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_pagination_meta_empty_table() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.pages, 0);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("CONFLICT", "exists")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let response = AppError::from(DbError::duplicate("Hash", "abc")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
