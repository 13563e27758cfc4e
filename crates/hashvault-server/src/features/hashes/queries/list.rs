use serde::{Deserialize, Serialize};

use crate::api::response::PaginationMeta;
use crate::db::{DbError, HashRecord, HashRepository};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListHashesQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
    /// Only records imported from this list, e.g. `VirusShare_00042`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListHashesResponse {
    pub items: Vec<HashRecord>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, thiserror::Error)]
pub enum ListHashesError {
    #[error("Page must be greater than 0")]
    InvalidPage,
    #[error("Per page must be between 1 and 100")]
    InvalidPerPage,
    #[error("Page is out of range")]
    PageOutOfRange,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl ListHashesQuery {
    pub fn validate(&self) -> Result<(), ListHashesError> {
        if let Some(page) = self.page {
            if page < 1 {
                return Err(ListHashesError::InvalidPage);
            }
        }
        if let Some(per_page) = self.per_page {
            if !(1..=MAX_PER_PAGE).contains(&per_page) {
                return Err(ListHashesError::InvalidPerPage);
            }
        }
        if self.offset().is_none() {
            return Err(ListHashesError::PageOutOfRange);
        }
        Ok(())
    }

    /// Rows skipped before this page; `None` if it does not fit in an `i64`.
    fn offset(&self) -> Option<i64> {
        (self.page() - 1).checked_mul(self.per_page())
    }

    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }
}

#[tracing::instrument(skip(repo))]
pub async fn handle(
    repo: &dyn HashRepository,
    query: ListHashesQuery,
) -> Result<ListHashesResponse, ListHashesError> {
    query.validate()?;

    let page = query.page();
    let per_page = query.per_page();
    let source_file = query.source_file.as_deref().filter(|s| !s.is_empty());

    let (items, total) = repo.list(page, per_page, source_file).await?;

    Ok(ListHashesResponse {
        items,
        pagination: PaginationMeta::new(page, per_page, total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let query = ListHashesQuery::default();
        assert!(query.validate().is_ok());
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_page_zero_rejected() {
        let query = ListHashesQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(ListHashesError::InvalidPage)));
    }

    #[test]
    fn test_page_past_addressable_range_rejected() {
        let query = ListHashesQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(ListHashesError::PageOutOfRange)));

        let query = ListHashesQuery {
            page: Some(i64::MAX),
            per_page: Some(1),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_per_page_bounds() {
        for per_page in [0, 101] {
            let query = ListHashesQuery {
                per_page: Some(per_page),
                ..Default::default()
            };
            assert!(matches!(query.validate(), Err(ListHashesError::InvalidPerPage)));
        }

        let query = ListHashesQuery {
            per_page: Some(100),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }
}
