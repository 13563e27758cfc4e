//! Job enumeration
//!
//! Walks identifiers `0..=max_files` in order. A file already on disk counts
//! as downloaded and goes straight to the import queue; anything else becomes
//! a download job.

use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::CrawlConfig;
use super::download::DownloadJob;
use super::import::ImportJob;
use super::pool::JobSender;
use super::progress::ProgressTracker;
use super::CrawlError;

/// Numeric index of a remote hash list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileIdentifier(pub u32);

impl FileIdentifier {
    /// `<prefix><5-digit zero-padded id>.<extension>`
    pub fn file_name(&self, prefix: &str, extension: &str) -> String {
        format!("{}{:05}.{}", prefix, self.0, extension)
    }
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

/// Maps identifiers to remote names and local paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNaming {
    pub prefix: String,
    pub extension: String,
    pub out_dir: PathBuf,
}

impl FileNaming {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            prefix: config.file_prefix.clone(),
            extension: config.file_extension.clone(),
            out_dir: config.out_dir.clone(),
        }
    }

    pub fn file_name(&self, id: FileIdentifier) -> String {
        id.file_name(&self.prefix, &self.extension)
    }

    pub fn local_path(&self, id: FileIdentifier) -> PathBuf {
        self.out_dir.join(self.file_name(id))
    }
}

/// Feeds both stages for one run; consumed by [`run`](Self::run)
pub struct JobEnumerator {
    naming: FileNaming,
    max_files: u32,
    downloads: JobSender<DownloadJob>,
    imports: JobSender<ImportJob>,
    progress: ProgressTracker,
    cancel: CancellationToken,
}

impl JobEnumerator {
    pub fn new(
        naming: FileNaming,
        max_files: u32,
        downloads: JobSender<DownloadJob>,
        imports: JobSender<ImportJob>,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            naming,
            max_files,
            downloads,
            imports,
            progress,
            cancel,
        }
    }

    /// Submit one job per identifier.
    ///
    /// Both senders are dropped on return, so once every other holder is
    /// gone the corresponding queues close.
    pub async fn run(self) -> Result<(), CrawlError> {
        let mut queued_downloads = 0u64;
        let mut already_present = 0u64;

        for id in (0..=self.max_files).map(FileIdentifier) {
            if self.cancel.is_cancelled() {
                info!(next = %id, "Enumeration cancelled");
                return Err(CrawlError::Cancelled);
            }

            let file_path = self.naming.local_path(id);

            // Presence on disk is the resume marker; `.part` files never sit at this path.
            if tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
                self.progress.record_downloaded();
                already_present += 1;
                self.imports.submit(ImportJob { file_path }).await?;
            } else {
                queued_downloads += 1;
                self.downloads
                    .submit(DownloadJob {
                        file_name: self.naming.file_name(id),
                        file_path,
                    })
                    .await?;
            }
        }

        debug!(queued_downloads, already_present, "Enumeration complete");
        Ok(())
    }
}
