pub mod response;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::config::CorsConfig;
use crate::db::HashRepository;
use crate::features::{self, FeatureState};
use crate::middleware;

/// Build the application router with all routes and middleware
pub fn create_router(state: FeatureState, cors: &CorsConfig) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health_check))
        .with_state(Arc::clone(&state.repo));

    health_routes
        .nest("/api/v1", features::router(state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

/// Health check handler
async fn health_check(State(repo): State<Arc<dyn HashRepository>>) -> Response {
    match repo.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "version": env!("CARGO_PKG_VERSION"),
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                })),
            )
                .into_response()
        },
    }
}
