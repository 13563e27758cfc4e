use serde::{Deserialize, Serialize};

use crate::db::{DbError, HashRepository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Number of distinct hashes stored
    pub total: i64,
}

pub async fn handle(repo: &dyn HashRepository) -> Result<StatsResponse, DbError> {
    Ok(StatsResponse {
        total: repo.count().await?,
    })
}
