//! Hashvault Server Library
//!
//! Crawls numbered MD5 hash lists from a remote host, imports them into
//! PostgreSQL and serves lookups over HTTP.
//!
//! # Overview
//!
//! - **Crawl**: Bounded download and import worker pools joined by a bounded
//!   handoff queue, with a single-flight run guard and live progress
//! - **Database**: PostgreSQL through SQLx with idempotent bulk inserts
//! - **API**: Axum routes for hash lookup, listing, statistics and crawl control
//! - **Configuration**: Environment-based configuration management
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hashvault_server::crawl::{CrawlService, HttpHashListSource};
//! use hashvault_server::{config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     let repo = Arc::new(db::PgHashRepository::new(pool));
//!     let source = Arc::new(HttpHashListSource::new(
//!         config.crawl.base_url.clone(),
//!         config.crawl.request_timeout(),
//!     )?);
//!
//!     let crawler = CrawlService::new(config.crawl.clone(), repo, source);
//!     crawler.start()?;
//!     crawler.wait_idle().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod crawl;
pub mod db;
pub mod features;
pub mod middleware;

pub use crawl::{CrawlError, CrawlService};
pub use db::DbError;
