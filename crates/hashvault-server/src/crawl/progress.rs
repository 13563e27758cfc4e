//! Shared run state: single-flight flag plus live progress
//!
//! One `RwLock` guards both the "a run is active" flag and the progress
//! value, so the check-and-set in [`ProgressTracker::try_begin`] and every
//! field update are serialised against snapshot reads. Counters that many
//! workers bump concurrently are atomics; their latest value is copied into
//! the progress under the lock, which keeps the published numbers monotonic.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lifecycle phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    /// No run has happened since startup
    #[default]
    Idle,
    Starting,
    /// Downloads and imports overlap in this phase
    Processing,
    Done,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlPhase::Idle => "idle",
            CrawlPhase::Starting => "starting",
            CrawlPhase::Processing => "processing",
            CrawlPhase::Done => "done",
        }
    }
}

impl std::fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of a run's progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlProgress {
    pub is_running: bool,
    pub phase: CrawlPhase,
    /// Number of file identifiers in the run
    pub total: u64,
    /// Files already present locally or fetched successfully
    pub current: u64,
    /// Records handed to the store
    pub imported: u64,
    /// Files that could not be fetched or opened
    pub failed: u64,
    pub current_file: String,
}

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    /// Runs claimed since startup
    runs_started: u64,
    progress: CrawlProgress,
}

#[derive(Debug, Default)]
struct RunCounters {
    downloaded: AtomicU64,
    imported: AtomicU64,
    failed: AtomicU64,
}

impl RunCounters {
    fn reset(&self) {
        self.downloaded.store(0, Ordering::SeqCst);
        self.imported.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
    }
}

/// Handle to the shared run state; cheap to clone
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    state: Arc<RwLock<RunState>>,
    counters: Arc<RunCounters>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` only while a run is active; a finished run stays frozen.
    fn update_running(&self, update: impl FnOnce(&mut CrawlProgress)) {
        let mut state = self.write();
        if state.progress.is_running {
            update(&mut state.progress);
        }
    }

    pub fn snapshot(&self) -> CrawlProgress {
        self.read().progress.clone()
    }

    pub fn is_running(&self) -> bool {
        self.read().running
    }

    /// Atomically claim the single run slot.
    ///
    /// On success the progress is reset for a run over `total` files and the
    /// fresh snapshot is returned. If a run is already active the current
    /// snapshot comes back as the error.
    pub(crate) fn try_begin(&self, total: u64) -> Result<CrawlProgress, CrawlProgress> {
        let mut state = self.write();
        if state.running {
            return Err(state.progress.clone());
        }

        self.counters.reset();
        state.running = true;
        state.runs_started += 1;
        state.progress = CrawlProgress {
            is_running: true,
            phase: CrawlPhase::Starting,
            total,
            ..CrawlProgress::default()
        };

        Ok(state.progress.clone())
    }

    /// Number of successful [`try_begin`](Self::try_begin) calls so far.
    pub(crate) fn runs_started(&self) -> u64 {
        self.read().runs_started
    }

    pub(crate) fn enter_processing(&self) {
        self.update_running(|p| p.phase = CrawlPhase::Processing);
    }

    /// Terminal transition; releases the run slot.
    pub(crate) fn finish(&self) -> CrawlProgress {
        let mut state = self.write();
        state.running = false;
        state.progress.is_running = false;
        state.progress.phase = CrawlPhase::Done;
        state.progress.clone()
    }

    pub fn set_current_file(&self, name: impl Into<String>) {
        let name = name.into();
        self.update_running(|p| p.current_file = name);
    }

    /// Count one file as available locally, fetched or already present.
    pub fn record_downloaded(&self) {
        self.counters.downloaded.fetch_add(1, Ordering::SeqCst);
        self.update_running(|p| p.current = self.counters.downloaded.load(Ordering::SeqCst));
    }

    /// Count one file that could not be fetched or opened.
    pub fn record_failed(&self) {
        self.counters.failed.fetch_add(1, Ordering::SeqCst);
        self.update_running(|p| p.failed = self.counters.failed.load(Ordering::SeqCst));
    }

    /// Add records handed to the store.
    pub fn record_imported(&self, records: u64) {
        self.counters.imported.fetch_add(records, Ordering::SeqCst);
        self.update_running(|p| p.imported = self.counters.imported.load(Ordering::SeqCst));
    }
}
