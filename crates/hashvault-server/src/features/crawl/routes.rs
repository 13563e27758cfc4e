//! Crawl control routes
//!
//! - `POST /api/v1/crawl` - Start a crawl run in the background
//! - `GET /api/v1/crawl/status` - Live progress of the current or last run

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::response::{ApiResponse, ErrorDetail, ErrorResponse};
use crate::crawl::{CrawlError, CrawlProgress, CrawlService};

pub fn crawl_routes() -> Router<CrawlService> {
    Router::new()
        .route("/", post(start_crawl))
        .route("/status", get(crawl_status))
}

#[derive(Debug, Serialize)]
pub struct CrawlStarted {
    pub message: String,
    pub progress: CrawlProgress,
}

/// Body of a rejected start: the error plus the progress of the active run
#[derive(Debug, Serialize)]
pub struct CrawlConflict {
    pub success: bool,
    pub error: ErrorDetail,
    pub progress: CrawlProgress,
}

/// Start a crawl
///
/// # Response
///
/// - `202 Accepted` - Run started; poll the status route for progress
/// - `409 Conflict` - A run is already active; its progress is included
async fn start_crawl(State(crawler): State<CrawlService>) -> Response {
    match crawler.start() {
        Ok(progress) => {
            let body = CrawlStarted {
                message: "crawl started".to_string(),
                progress,
            };
            (StatusCode::ACCEPTED, Json(ApiResponse::success(body))).into_response()
        },
        Err(CrawlError::AlreadyRunning(progress)) => {
            tracing::debug!(current = progress.current, "Crawl start rejected, run active");
            let body = CrawlConflict {
                success: false,
                error: ErrorDetail {
                    code: "CRAWL_IN_PROGRESS".to_string(),
                    message: "crawl already in progress".to_string(),
                    details: None,
                },
                progress,
            };
            (StatusCode::CONFLICT, Json(body)).into_response()
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to start crawl");
            let body = ErrorResponse::new("INTERNAL_ERROR", e.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        },
    }
}

async fn crawl_status(State(crawler): State<CrawlService>) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(crawler.status()))).into_response()
}
