//! Crawl-and-import pipeline
//!
//! Enumerator -> download pool -> handoff queue -> import pool -> store.
//! Files already on disk skip the download pool and go straight to the
//! handoff queue. [`CrawlService`] owns the run and allows one at a time.

pub mod config;
pub mod coordinator;
pub mod download;
pub mod enumerator;
pub mod import;
pub mod pool;
pub mod progress;
pub mod source;

pub use config::CrawlConfig;
pub use coordinator::CrawlService;
pub use download::{DownloadJob, DownloadWorker};
pub use enumerator::{FileIdentifier, FileNaming, JobEnumerator};
pub use import::{import_file, parse_line, ImportJob, ImportStats, ImportWorker};
pub use pool::{JobSender, PoolClosed, Worker, WorkerPool};
pub use progress::{CrawlPhase, CrawlProgress, ProgressTracker};
pub use source::{ByteStream, FetchError, HashListSource, HttpHashListSource};

use crate::db::DbError;

/// Crawl pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Start was rejected; carries the live snapshot of the active run.
    #[error("crawl already in progress")]
    AlreadyRunning(CrawlProgress),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Import queue is closed")]
    HandoffClosed,

    #[error("Crawl cancelled")]
    Cancelled,
}

impl<J> From<PoolClosed<J>> for CrawlError {
    fn from(_: PoolClosed<J>) -> Self {
        CrawlError::HandoffClosed
    }
}
