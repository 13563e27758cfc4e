//! Download stage
//!
//! Fetches one remote list per job and writes it to its local path. The body
//! is streamed into `<path>.part` and renamed into place only after the whole
//! body has been written and synced, so a local file at the final path is
//! always complete. Fetched files are forwarded to the import queue.

use async_trait::async_trait;
use futures::StreamExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::import::ImportJob;
use super::pool::{JobSender, Worker};
use super::progress::ProgressTracker;
use super::source::{ByteStream, FetchError, HashListSource};
use super::CrawlError;

/// One remote file to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub file_name: String,
    pub file_path: PathBuf,
}

pub struct DownloadWorker {
    source: Arc<dyn HashListSource>,
    handoff: JobSender<ImportJob>,
    progress: ProgressTracker,
    cancel: CancellationToken,
}

impl DownloadWorker {
    pub fn new(
        source: Arc<dyn HashListSource>,
        handoff: JobSender<ImportJob>,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            handoff,
            progress,
            cancel,
        }
    }

    async fn fetch(&self, job: &DownloadJob) -> Result<u64, CrawlError> {
        let body = self.source.open(&job.file_name).await?;
        write_atomically(&job.file_path, body).await
    }
}

#[async_trait]
impl Worker<DownloadJob> for DownloadWorker {
    type Error = CrawlError;

    async fn process(&self, job: DownloadJob) -> Result<(), CrawlError> {
        if self.cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        self.progress.set_current_file(&job.file_name);

        match self.fetch(&job).await {
            Ok(bytes) => {
                debug!(file = %job.file_name, bytes, "Downloaded hash list");
            },
            Err(e) => {
                self.progress.record_failed();
                match &e {
                    // Past the end of the published range
                    CrawlError::Fetch(FetchError::Status(404)) => {
                        debug!(file = %job.file_name, "Hash list not found");
                    },
                    _ => warn!(file = %job.file_name, error = %e, "Download failed, skipping"),
                }
                return Err(e);
            },
        }

        self.progress.record_downloaded();
        self.handoff
            .submit(ImportJob {
                file_path: job.file_path,
            })
            .await?;

        Ok(())
    }
}

/// Temporary path a download is written to before being renamed into place.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Stream `body` to `path` via a `.part` file; on any failure nothing is left behind.
pub async fn write_atomically(path: &Path, mut body: ByteStream) -> Result<u64, CrawlError> {
    let partial = partial_path(path);

    let result = async {
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&partial, path).await?;
        Ok::<_, CrawlError>(written)
    }
    .await;

    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            trace!(path = %partial.display(), error = %e, "No partial file to remove");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::pool::WorkerPool;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct FakeSource {
        chunks: Vec<&'static str>,
        status: Option<u16>,
        fail_midway: bool,
    }

    impl FakeSource {
        fn serving(chunks: Vec<&'static str>) -> Self {
            Self {
                chunks,
                status: None,
                fail_midway: false,
            }
        }
    }

    #[async_trait]
    impl HashListSource for FakeSource {
        async fn open(&self, _file_name: &str) -> Result<ByteStream, FetchError> {
            if let Some(status) = self.status {
                return Err(FetchError::Status(status));
            }
            let mut items: Vec<Result<Bytes, FetchError>> = self
                .chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect();
            if self.fail_midway {
                items.push(Err(FetchError::Body("connection reset".to_string())));
            }
            Ok(futures::stream::iter(items).boxed())
        }
    }

    #[derive(Default)]
    struct Collector {
        jobs: Mutex<Vec<ImportJob>>,
    }

    #[async_trait]
    impl Worker<ImportJob> for Collector {
        type Error = String;

        async fn process(&self, job: ImportJob) -> Result<(), String> {
            self.jobs.lock().unwrap().push(job);
            Ok(())
        }
    }

    async fn run_one(source: FakeSource, job: DownloadJob) -> (Result<(), CrawlError>, Vec<ImportJob>, ProgressTracker) {
        let progress = ProgressTracker::new();
        progress.try_begin(1).unwrap();

        let collector = Arc::new(Collector::default());
        let mut imports = WorkerPool::new("collect", 1);
        imports.start(Arc::clone(&collector));

        let worker = DownloadWorker::new(
            Arc::new(source),
            imports.sender().unwrap(),
            progress.clone(),
            CancellationToken::new(),
        );
        let result = worker.process(job).await;
        drop(worker);
        imports.wait().await;

        let jobs = collector.jobs.lock().unwrap().clone();
        (result, jobs, progress)
    }

    fn job_in(dir: &Path) -> DownloadJob {
        DownloadJob {
            file_name: "VirusShare_00000.md5".to_string(),
            file_path: dir.join("VirusShare_00000.md5"),
        }
    }

    #[test]
    fn test_partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/data/VirusShare_00001.md5")),
            PathBuf::from("/data/VirusShare_00001.md5.part")
        );
    }

    #[tokio::test]
    async fn test_success_writes_file_and_forwards_import() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());

        let (result, jobs, progress) =
            run_one(FakeSource::serving(vec!["abc\n", "def\n"]), job.clone()).await;

        assert!(result.is_ok());
        assert_eq!(std::fs::read_to_string(&job.file_path).unwrap(), "abc\ndef\n");
        assert!(!partial_path(&job.file_path).exists());
        assert_eq!(jobs, vec![ImportJob { file_path: job.file_path }]);

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.current, 1);
        assert_eq!(snapshot.current_file, "VirusShare_00000.md5");
    }

    #[tokio::test]
    async fn test_body_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let source = FakeSource {
            fail_midway: true,
            ..FakeSource::serving(vec!["partial content"])
        };

        let (result, jobs, progress) = run_one(source, job.clone()).await;

        assert!(matches!(result, Err(CrawlError::Fetch(FetchError::Body(_)))));
        assert!(!job.file_path.exists());
        assert!(!partial_path(&job.file_path).exists());
        assert!(jobs.is_empty());
        assert_eq!(progress.snapshot().current, 0);
        assert_eq!(progress.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_not_found_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let source = FakeSource {
            status: Some(404),
            ..FakeSource::serving(vec![])
        };

        let (result, jobs, progress) = run_one(source, job.clone()).await;

        assert!(matches!(result, Err(CrawlError::Fetch(FetchError::Status(404)))));
        assert!(!job.file_path.exists());
        assert!(jobs.is_empty());
        assert_eq!(progress.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_cancelled_job_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let job = job_in(dir.path());
        let progress = ProgressTracker::new();
        progress.try_begin(1).unwrap();

        let imports: WorkerPool<ImportJob> = WorkerPool::new("unused", 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let worker = DownloadWorker::new(
            Arc::new(FakeSource::serving(vec!["abc\n"])),
            imports.sender().unwrap(),
            progress.clone(),
            cancel,
        );

        let result = worker.process(job.clone()).await;
        assert!(matches!(result, Err(CrawlError::Cancelled)));
        assert!(!job.file_path.exists());
        assert_eq!(progress.snapshot().failed, 0);
    }
}
