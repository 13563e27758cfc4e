//! Database access
//!
//! Connection pool setup and the hash record repository.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub mod hashes;

pub use hashes::{HashRecord, HashRepository, NewHashRecord, PgHashRepository};

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum DbError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Database configuration is invalid or missing
    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),

    /// Record already exists (unique constraint violation)
    #[error("{0}")]
    Duplicate(String),
}

impl DbError {
    pub fn duplicate(resource_type: &str, identifier: &str) -> Self {
        Self::Duplicate(format!("{} '{}' already exists", resource_type, identifier))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    if config.url.is_empty() {
        return Err(DbError::config("DATABASE_URL is empty"));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Apply the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await?;
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}
