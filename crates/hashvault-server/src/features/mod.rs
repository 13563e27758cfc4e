//! Feature modules implementing the Hashvault API
//!
//! Each feature is a vertical slice:
//! - `commands/` - Write operations
//! - `queries/` - Read operations
//! - `routes.rs` - HTTP route definitions
//!
//! # Features
//!
//! - **hashes**: Lookup, listing, manual insert and statistics
//! - **crawl**: Starting crawl runs and reading their progress

pub mod crawl;
pub mod hashes;

use axum::Router;
use std::sync::Arc;

use crate::crawl::CrawlService;
use crate::db::HashRepository;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub repo: Arc<dyn HashRepository>,
    pub crawler: CrawlService,
}

/// Creates the API router with all feature routes mounted
///
/// - `/hashes` - Hash lookup and listing
/// - `/stats` - Store statistics
/// - `/crawl` - Crawl control
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/hashes", hashes::hashes_routes().with_state(Arc::clone(&state.repo)))
        .nest("/stats", hashes::stats_routes().with_state(Arc::clone(&state.repo)))
        .nest("/crawl", crawl::crawl_routes().with_state(state.crawler))
}
