//! Crawl configuration
//!
//! Values come from `CRAWL_*` environment variables, each with a fallback.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::env_or;

pub const DEFAULT_BASE_URL: &str = "https://virusshare.com/hashfiles/";
pub const DEFAULT_MAX_FILES: u32 = 499;
pub const DEFAULT_MAX_CONCURRENT: usize = 50;
pub const DEFAULT_MAX_IMPORT_WORKERS: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_OUT_DIR: &str = "data/hashfiles";
pub const DEFAULT_FILE_PREFIX: &str = "VirusShare_";
pub const DEFAULT_FILE_EXTENSION: &str = "md5";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Settings for one crawl-and-import run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Base URL the file names are appended to
    pub base_url: String,
    /// Highest file identifier, inclusive
    pub max_files: u32,
    /// Download parallelism, also the handoff queue capacity
    pub max_concurrent: usize,
    /// Import parallelism
    pub max_import_workers: usize,
    /// Records per bulk insert
    pub batch_size: usize,
    /// Local cache directory for downloaded lists
    pub out_dir: PathBuf,
    pub file_prefix: String,
    pub file_extension: String,
    pub request_timeout_secs: u64,
}

impl CrawlConfig {
    /// Load crawl configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CRAWL_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            max_files: env_or("CRAWL_MAX_FILES", DEFAULT_MAX_FILES),
            max_concurrent: env_or("CRAWL_MAX_CONCURRENT", DEFAULT_MAX_CONCURRENT),
            max_import_workers: env_or("CRAWL_MAX_IMPORT_WORKERS", DEFAULT_MAX_IMPORT_WORKERS),
            batch_size: env_or("CRAWL_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            out_dir: std::env::var("CRAWL_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUT_DIR)),
            file_prefix: std::env::var("CRAWL_FILE_PREFIX")
                .unwrap_or_else(|_| DEFAULT_FILE_PREFIX.to_string()),
            file_extension: std::env::var("CRAWL_FILE_EXTENSION")
                .unwrap_or_else(|_| DEFAULT_FILE_EXTENSION.to_string()),
            request_timeout_secs: env_or(
                "CRAWL_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            ),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("CRAWL_BASE_URL cannot be empty");
        }
        if self.max_concurrent == 0 {
            anyhow::bail!("CRAWL_MAX_CONCURRENT must be greater than 0");
        }
        if self.max_import_workers == 0 {
            anyhow::bail!("CRAWL_MAX_IMPORT_WORKERS must be greater than 0");
        }
        if self.batch_size == 0 {
            anyhow::bail!("CRAWL_BATCH_SIZE must be greater than 0");
        }
        if self.file_extension.contains('.') {
            anyhow::bail!(
                "CRAWL_FILE_EXTENSION must not contain a dot, got: {}",
                self.file_extension
            );
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("CRAWL_REQUEST_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }

    /// Number of identifiers in `[0, max_files]`
    pub fn total_files(&self) -> u64 {
        u64::from(self.max_files) + 1
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            max_files: DEFAULT_MAX_FILES,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_import_workers: DEFAULT_MAX_IMPORT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_config_default() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_files, 499);
        assert_eq!(config.max_concurrent, 50);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.total_files(), 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let config = CrawlConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CrawlConfig {
            max_import_workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = CrawlConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dotted_extension_rejected() {
        let config = CrawlConfig {
            file_extension: ".md5".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_duration() {
        let config = CrawlConfig {
            request_timeout_secs: 45,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(45));
    }
}
