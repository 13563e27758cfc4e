use hashvault_common::Md5Hash;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, HashRecord, HashRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetHashQuery {
    pub md5_hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GetHashError {
    #[error("'{0}' is not a 32-character hexadecimal MD5 hash")]
    InvalidHash(String),
    #[error("Hash '{0}' not found")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

#[tracing::instrument(skip(repo))]
pub async fn handle(
    repo: &dyn HashRepository,
    query: GetHashQuery,
) -> Result<HashRecord, GetHashError> {
    let hash = Md5Hash::parse(query.md5_hash.trim())
        .ok_or_else(|| GetHashError::InvalidHash(query.md5_hash.clone()))?;

    repo.get_by_md5(hash.as_str())
        .await?
        .ok_or_else(|| GetHashError::NotFound(hash.into_inner()))
}
