//! Test helpers for Hashvault server integration tests
//!
//! - In-memory [`HashRepository`] with the same uniqueness rules as the table
//! - An instrumented [`HashListSource`] that records fetch concurrency
//! - Config and tracing setup
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use hashvault_server::crawl::{ByteStream, CrawlConfig, FetchError, HashListSource};
use hashvault_server::db::{DbError, DbResult, HashRecord, HashRepository, NewHashRecord};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hashvault_server=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Crawl settings pointing at `base_url` and caching into `out_dir`
pub fn crawl_config(base_url: &str, out_dir: &Path, max_files: u32) -> CrawlConfig {
    CrawlConfig {
        base_url: base_url.to_string(),
        max_files,
        max_concurrent: 4,
        max_import_workers: 2,
        batch_size: 1000,
        out_dir: out_dir.to_path_buf(),
        ..CrawlConfig::default()
    }
}

#[derive(Default)]
struct Table {
    records: Vec<HashRecord>,
    next_id: i64,
}

impl Table {
    fn contains(&self, md5_hash: &str) -> bool {
        self.records.iter().any(|r| r.md5_hash == md5_hash)
    }

    fn insert(&mut self, record: &NewHashRecord) -> HashRecord {
        self.next_id += 1;
        let stored = HashRecord {
            id: self.next_id,
            md5_hash: record.md5_hash.to_string(),
            source_file: record.source_file.clone(),
            created_at: record.created_at,
        };
        self.records.push(stored.clone());
        stored
    }
}

/// Store fake: `md5_hash` is unique and batch inserts skip duplicates.
#[derive(Default)]
pub struct InMemoryHashRepository {
    table: Mutex<Table>,
    batch_sizes: Mutex<Vec<usize>>,
    fail_pings: bool,
}

impl InMemoryHashRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            fail_pings: true,
            ..Self::default()
        }
    }

    pub fn hashes(&self) -> BTreeSet<String> {
        self.table
            .lock()
            .unwrap()
            .records
            .iter()
            .map(|r| r.md5_hash.clone())
            .collect()
    }

    pub fn records(&self) -> Vec<HashRecord> {
        self.table.lock().unwrap().records.clone()
    }

    /// Size of every `create_batch` call, in call order
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn seed(&self, md5_hash: &str, source_file: &str) -> HashRecord {
        let hash = hashvault_common::Md5Hash::parse(md5_hash).unwrap();
        self.table
            .lock()
            .unwrap()
            .insert(&NewHashRecord::new(hash, source_file))
    }
}

#[async_trait]
impl HashRepository for InMemoryHashRepository {
    async fn create(&self, record: NewHashRecord) -> DbResult<HashRecord> {
        let mut table = self.table.lock().unwrap();
        if table.contains(record.md5_hash.as_str()) {
            return Err(DbError::duplicate("Hash", record.md5_hash.as_str()));
        }
        Ok(table.insert(&record))
    }

    async fn create_batch(&self, records: &[NewHashRecord]) -> DbResult<u64> {
        self.batch_sizes.lock().unwrap().push(records.len());

        let mut table = self.table.lock().unwrap();
        let mut inserted = 0;
        for record in records {
            if !table.contains(record.md5_hash.as_str()) {
                table.insert(record);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn get_by_md5(&self, md5_hash: &str) -> DbResult<Option<HashRecord>> {
        let key = md5_hash.to_ascii_lowercase();
        let table = self.table.lock().unwrap();
        Ok(table.records.iter().find(|r| r.md5_hash == key).cloned())
    }

    async fn list(
        &self,
        page: i64,
        per_page: i64,
        source_file: Option<&str>,
    ) -> DbResult<(Vec<HashRecord>, i64)> {
        let table = self.table.lock().unwrap();
        let mut matching: Vec<HashRecord> = table
            .records
            .iter()
            .filter(|r| source_file.map_or(true, |s| r.source_file == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as i64;
        let offset = usize::try_from((page.max(1) - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Ok((items, total))
    }

    async fn count(&self) -> DbResult<i64> {
        Ok(self.table.lock().unwrap().records.len() as i64)
    }

    async fn ping(&self) -> DbResult<()> {
        if self.fail_pings {
            return Err(DbError::config("connection refused"));
        }
        Ok(())
    }
}

/// Serves the same body for every file after `delay`, tracking how many
/// fetches overlap.
pub struct InstrumentedSource {
    body: &'static str,
    delay: Duration,
    in_flight: AtomicUsize,
    high_water: AtomicUsize,
    calls: AtomicUsize,
}

impl InstrumentedSource {
    pub fn new(body: &'static str, delay: Duration) -> Self {
        Self {
            body,
            delay,
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HashListSource for InstrumentedSource {
    async fn open(&self, _file_name: &str) -> Result<ByteStream, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let chunk: Result<Bytes, FetchError> = Ok(Bytes::from_static(self.body.as_bytes()));
        Ok(futures::stream::iter(vec![chunk]).boxed())
    }
}

/// Hex string of `n`, zero-padded to a valid MD5 token
pub fn hash_for(n: u64) -> String {
    format!("{:032x}", n)
}
