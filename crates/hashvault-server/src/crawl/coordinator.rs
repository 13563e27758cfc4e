//! Crawl run coordinator
//!
//! Run lifecycle: `idle -> starting -> processing -> done`. [`CrawlService::start`]
//! claims the single run slot and spawns the pipeline:
//! 1. Ensure the output directory exists
//! 2. Start the import pool, then the download pool feeding it
//! 3. Enumerate identifiers into both pools
//! 4. Drain the download pool, which closes the import queue
//! 5. Drain the import pool and mark the run done

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::CrawlConfig;
use super::download::{DownloadJob, DownloadWorker};
use super::enumerator::{FileNaming, JobEnumerator};
use super::import::{ImportJob, ImportWorker};
use super::pool::WorkerPool;
use super::progress::{CrawlProgress, ProgressTracker};
use super::source::HashListSource;
use super::CrawlError;
use crate::db::HashRepository;

struct Inner {
    config: CrawlConfig,
    repo: Arc<dyn HashRepository>,
    source: Arc<dyn HashListSource>,
    progress: ProgressTracker,
    shutdown: CancellationToken,
    runs_finished: watch::Sender<u64>,
}

/// Entry point for starting and observing crawl runs; cheap to clone
#[derive(Clone)]
pub struct CrawlService {
    inner: Arc<Inner>,
}

impl CrawlService {
    pub fn new(
        config: CrawlConfig,
        repo: Arc<dyn HashRepository>,
        source: Arc<dyn HashListSource>,
    ) -> Self {
        let (runs_finished, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                config,
                repo,
                source,
                progress: ProgressTracker::new(),
                shutdown: CancellationToken::new(),
                runs_finished,
            }),
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.inner.config
    }

    /// Start a run in the background.
    ///
    /// Returns the initial snapshot, or [`CrawlError::AlreadyRunning`] with the
    /// live snapshot when a run is in progress. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) -> Result<CrawlProgress, CrawlError> {
        let snapshot = self
            .inner
            .progress
            .try_begin(self.inner.config.total_files())
            .map_err(CrawlError::AlreadyRunning)?;

        info!(
            total = snapshot.total,
            base_url = %self.inner.config.base_url,
            out_dir = %self.inner.config.out_dir.display(),
            "Crawl run started"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run().await });

        Ok(snapshot)
    }

    pub fn status(&self) -> CrawlProgress {
        self.inner.progress.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.inner.progress.is_running()
    }

    /// Cancel the active run, if any, and every run started afterwards.
    pub fn shutdown(&self) {
        if self.is_running() {
            info!("Cancelling active crawl run");
        }
        self.inner.shutdown.cancel();
    }

    /// Wait until every run started so far has reached `done`.
    pub async fn wait_idle(&self) {
        let target = self.inner.progress.runs_started();
        let mut finished = self.inner.runs_finished.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = finished.wait_for(|count| *count >= target).await;
    }
}

impl Inner {
    async fn run(&self) {
        let started = Instant::now();
        let cancel = self.shutdown.child_token();

        if let Err(e) = self.execute(&cancel).await {
            match e {
                CrawlError::Cancelled => warn!("Crawl run cancelled"),
                e => error!(error = %e, "Crawl run aborted"),
            }
        }

        let done = self.progress.finish();
        info!(
            total = done.total,
            current = done.current,
            imported = done.imported,
            failed = done.failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Crawl run finished"
        );

        self.runs_finished.send_modify(|count| *count += 1);
    }

    async fn execute(&self, cancel: &CancellationToken) -> Result<(), CrawlError> {
        tokio::fs::create_dir_all(&self.config.out_dir).await?;
        self.progress.enter_processing();

        let mut imports: WorkerPool<ImportJob> = WorkerPool::with_capacity(
            "import",
            self.config.max_import_workers,
            self.config.max_concurrent,
        );
        imports.start(Arc::new(ImportWorker::new(
            Arc::clone(&self.repo),
            self.config.batch_size,
            self.progress.clone(),
            cancel.clone(),
        )));
        let handoff = imports.sender().ok_or(CrawlError::HandoffClosed)?;
        // From here on the queue stays open only while download workers or
        // the enumerator hold a sender.
        imports.close();

        let mut downloads: WorkerPool<DownloadJob> =
            WorkerPool::new("download", self.config.max_concurrent);
        downloads.start(Arc::new(DownloadWorker::new(
            Arc::clone(&self.source),
            handoff.clone(),
            self.progress.clone(),
            cancel.clone(),
        )));
        let download_queue = downloads.sender().ok_or(CrawlError::HandoffClosed)?;
        downloads.close();

        let enumerator = JobEnumerator::new(
            FileNaming::from_config(&self.config),
            self.config.max_files,
            download_queue,
            handoff,
            self.progress.clone(),
            cancel.clone(),
        );
        let enumerated = enumerator.run().await;

        downloads.wait().await;
        imports.wait().await;

        enumerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::progress::CrawlPhase;
    use crate::crawl::source::{ByteStream, FetchError};
    use crate::db::{DbResult, HashRecord, NewHashRecord};
    use async_trait::async_trait;
    use std::time::Duration;

    struct NullRepo;

    #[async_trait]
    impl HashRepository for NullRepo {
        async fn create(&self, _record: NewHashRecord) -> DbResult<HashRecord> {
            Err(crate::db::DbError::config("not used"))
        }

        async fn create_batch(&self, records: &[NewHashRecord]) -> DbResult<u64> {
            Ok(records.len() as u64)
        }

        async fn get_by_md5(&self, _md5_hash: &str) -> DbResult<Option<HashRecord>> {
            Ok(None)
        }

        async fn list(
            &self,
            _page: i64,
            _per_page: i64,
            _source_file: Option<&str>,
        ) -> DbResult<(Vec<HashRecord>, i64)> {
            Ok((Vec::new(), 0))
        }

        async fn count(&self) -> DbResult<i64> {
            Ok(0)
        }

        async fn ping(&self) -> DbResult<()> {
            Ok(())
        }
    }

    /// Waits before answering 404, so a run stays active for a while.
    struct SlowMissingSource(Duration);

    #[async_trait]
    impl HashListSource for SlowMissingSource {
        async fn open(&self, _file_name: &str) -> Result<ByteStream, FetchError> {
            tokio::time::sleep(self.0).await;
            Err(FetchError::Status(404))
        }
    }

    fn service(dir: &std::path::Path, max_files: u32, delay: Duration) -> CrawlService {
        let config = CrawlConfig {
            max_files,
            max_concurrent: 2,
            max_import_workers: 1,
            out_dir: dir.to_path_buf(),
            ..Default::default()
        };
        CrawlService::new(config, Arc::new(NullRepo), Arc::new(SlowMissingSource(delay)))
    }

    #[tokio::test]
    async fn test_status_before_any_run_is_idle() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), 0, Duration::ZERO);
        let status = service.status();
        assert_eq!(status.phase, CrawlPhase::Idle);
        assert!(!status.is_running);
        service.wait_idle().await;
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_running() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), 3, Duration::from_millis(100));

        let first = service.start().unwrap();
        assert!(first.is_running);
        assert_eq!(first.total, 4);

        match service.start() {
            Err(CrawlError::AlreadyRunning(progress)) => assert!(progress.is_running),
            other => panic!("expected AlreadyRunning, got {:?}", other.map(|p| p.phase)),
        }

        service.wait_idle().await;
        let done = service.status();
        assert_eq!(done.phase, CrawlPhase::Done);
        assert_eq!(done.failed, 4);
        assert!(service.start().is_ok());
        service.wait_idle().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_run_which_still_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), 200, Duration::from_millis(20));

        service.start().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        service.shutdown();

        tokio::time::timeout(Duration::from_secs(5), service.wait_idle())
            .await
            .unwrap();
        let done = service.status();
        assert!(!done.is_running);
        assert_eq!(done.phase, CrawlPhase::Done);
        assert!(done.failed < 201);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wait_idle_observing_running_run_waits_for_it() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), 1, Duration::from_millis(50));

        let watcher = {
            let service = service.clone();
            tokio::spawn(async move {
                while !service.is_running() {
                    tokio::task::yield_now().await;
                }
                service.wait_idle().await;
                service.status()
            })
        };

        service.start().unwrap();

        let seen = tokio::time::timeout(Duration::from_secs(5), watcher)
            .await
            .unwrap()
            .unwrap();
        assert!(!seen.is_running);
        assert_eq!(seen.phase, CrawlPhase::Done);
    }

    #[tokio::test]
    async fn test_unwritable_out_dir_still_reaches_done() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let service = service(&blocker.join("nested"), 1, Duration::ZERO);

        service.start().unwrap();
        service.wait_idle().await;

        let done = service.status();
        assert_eq!(done.phase, CrawlPhase::Done);
        assert_eq!(done.current, 0);
    }
}
