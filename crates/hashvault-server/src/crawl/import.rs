//! Import stage
//!
//! Reads one local hash list per job, keeps the lines that are valid MD5
//! tokens and writes them to the store in fixed-size batches. Malformed lines
//! and failed batch inserts do not stop the file.

use async_trait::async_trait;
use hashvault_common::Md5Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::pool::Worker;
use super::progress::ProgressTracker;
use super::CrawlError;
use crate::db::{HashRepository, NewHashRecord};

/// Lines longer than this are skipped as malformed without being buffered.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// One local file to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    pub file_path: PathBuf,
}

/// Per-file import counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub lines: u64,
    /// Blank, comment, non-UTF-8, over-long and malformed lines
    pub skipped: u64,
    /// Records handed to the store
    pub batched: u64,
    /// Records the store reported as new
    pub inserted: u64,
    pub batches: u64,
    pub failed_batches: u64,
}

/// Extract a hash from one line of a list.
///
/// Surrounding whitespace is ignored. Blank lines, `#` comments and anything
/// that is not exactly 32 hex characters yield `None`.
pub fn parse_line(line: &str) -> Option<Md5Hash> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Md5Hash::parse(line)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `VirusShare_00042.md5` -> `VirusShare_00042`
fn source_file_name(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

enum ReadLine {
    Eof,
    Line,
    TooLong,
}

/// Read one `\n`-terminated line of at most [`MAX_LINE_LEN`] bytes into `line`.
///
/// An over-long line is discarded up to and including its newline.
async fn read_line<R>(reader: &mut R, line: &mut Vec<u8>) -> std::io::Result<ReadLine>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64 + 1)
        .read_until(b'\n', line)
        .await?;

    if read == 0 {
        return Ok(ReadLine::Eof);
    }
    if line.len() <= MAX_LINE_LEN || line.last() == Some(&b'\n') {
        return Ok(ReadLine::Line);
    }

    line.clear();
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|&b| b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                break;
            },
            None => {
                let len = buf.len();
                reader.consume(len);
            },
        }
    }
    Ok(ReadLine::TooLong)
}

async fn flush_batch(
    repo: &dyn HashRepository,
    batch: &mut Vec<NewHashRecord>,
    stats: &mut ImportStats,
    source_file: &str,
) {
    if batch.is_empty() {
        return;
    }

    stats.batches += 1;
    stats.batched += batch.len() as u64;

    match repo.create_batch(batch).await {
        Ok(inserted) => stats.inserted += inserted,
        Err(e) => {
            stats.failed_batches += 1;
            warn!(source_file, records = batch.len(), error = %e, "Batch insert failed");
        },
    }

    batch.clear();
}

/// Import every valid hash in `path`, `batch_size` records per insert.
///
/// Only failing to open the file is an error. A read error part way through
/// stops reading and the lines read so far are still imported.
pub async fn import_file(
    repo: &dyn HashRepository,
    path: &Path,
    batch_size: usize,
) -> Result<ImportStats, CrawlError> {
    let file = tokio::fs::File::open(path).await?;
    let mut reader = BufReader::new(file);

    let batch_size = batch_size.max(1);
    let source_file = source_file_name(path);
    let mut stats = ImportStats::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut line = Vec::new();

    loop {
        match read_line(&mut reader, &mut line).await {
            Ok(ReadLine::Eof) => break,
            Ok(ReadLine::Line) => {},
            Ok(ReadLine::TooLong) => {
                stats.lines += 1;
                stats.skipped += 1;
                continue;
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Read failed, keeping lines read so far");
                break;
            },
        }

        stats.lines += 1;

        let hash = std::str::from_utf8(&line).ok().and_then(parse_line);
        let Some(hash) = hash else {
            stats.skipped += 1;
            continue;
        };

        batch.push(NewHashRecord::new(hash, source_file.as_str()));
        if batch.len() >= batch_size {
            flush_batch(repo, &mut batch, &mut stats, &source_file).await;
        }
    }

    flush_batch(repo, &mut batch, &mut stats, &source_file).await;

    Ok(stats)
}

pub struct ImportWorker {
    repo: Arc<dyn HashRepository>,
    batch_size: usize,
    progress: ProgressTracker,
    cancel: CancellationToken,
}

impl ImportWorker {
    pub fn new(
        repo: Arc<dyn HashRepository>,
        batch_size: usize,
        progress: ProgressTracker,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            repo,
            batch_size,
            progress,
            cancel,
        }
    }
}

#[async_trait]
impl Worker<ImportJob> for ImportWorker {
    type Error = CrawlError;

    async fn process(&self, job: ImportJob) -> Result<(), CrawlError> {
        if self.cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        let name = base_name(&job.file_path);
        self.progress.set_current_file(format!("{} (importing)", name));

        match import_file(self.repo.as_ref(), &job.file_path, self.batch_size).await {
            Ok(stats) => {
                self.progress.record_imported(stats.batched);
                debug!(
                    file = %name,
                    lines = stats.lines,
                    skipped = stats.skipped,
                    batched = stats.batched,
                    inserted = stats.inserted,
                    failed_batches = stats.failed_batches,
                    "Imported hash list"
                );
                Ok(())
            },
            Err(e) => {
                self.progress.record_failed();
                warn!(file = %name, error = %e, "Could not open hash list");
                Err(e)
            },
        }
    }
}
