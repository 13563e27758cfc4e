//! Create hash command
//!
//! Adds a single hash by hand. The crawl pipeline uses bulk inserts instead.

use hashvault_common::Md5Hash;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, HashRecord, HashRepository, NewHashRecord};

/// Source label for hashes added through the API
pub const MANUAL_SOURCE: &str = "manual";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHashCommand {
    pub md5_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateHashError {
    #[error("'{0}' is not a 32-character hexadecimal MD5 hash")]
    InvalidHash(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for CreateHashError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(msg) => CreateHashError::Duplicate(msg),
            other => CreateHashError::Database(other),
        }
    }
}

impl CreateHashCommand {
    pub fn validate(&self) -> Result<Md5Hash, CreateHashError> {
        Md5Hash::parse(self.md5_hash.trim())
            .ok_or_else(|| CreateHashError::InvalidHash(self.md5_hash.clone()))
    }
}

#[tracing::instrument(skip(repo))]
pub async fn handle(
    repo: &dyn HashRepository,
    command: CreateHashCommand,
) -> Result<HashRecord, CreateHashError> {
    let hash = command.validate()?;
    let source_file = command
        .source_file
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| MANUAL_SOURCE.to_string());

    let record = repo.create(NewHashRecord::new(hash, source_file)).await?;
    Ok(record)
}
