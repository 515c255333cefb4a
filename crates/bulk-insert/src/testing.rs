//! In-memory [`RecordStore`] for exercising the engine without a database.
//!
//! `MemoryStore` emulates a bounded connection pool with a semaphore, can
//! inject failures into specific grouped writes or count queries, and
//! records how many callers held a "connection" at the same time.

use crate::error::StoreError;
use crate::record::Record;
use crate::store::RecordStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

/// Which grouped writes fail, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Every write succeeds.
    Never,
    /// The `nth` write (1-based, in call order) fails after applying
    /// `applied` of its rows. Every other write succeeds.
    RejectNth { nth: usize, applied: u64 },
    /// Every write fails without applying anything.
    RejectAll,
    /// Every call fails to obtain a connection.
    Unreachable,
}

impl FailurePolicy {
    pub fn reject_nth(nth: usize) -> Self {
        FailurePolicy::RejectNth { nth, applied: 0 }
    }

    pub fn partial_nth(nth: usize, applied: u64) -> Self {
        FailurePolicy::RejectNth { nth, applied }
    }
}

pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    rows: AtomicU64,
    connections: Semaphore,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    insert_calls: AtomicUsize,
    count_calls: AtomicUsize,
    failure: FailurePolicy,
    failing_count_call: Option<usize>,
    write_latency: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Default connection cap for a memory store.
    pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            rows: AtomicU64::new(0),
            connections: Semaphore::new(Self::DEFAULT_MAX_CONNECTIONS),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
            failure: FailurePolicy::Never,
            failing_count_call: None,
            write_latency: Duration::ZERO,
        }
    }

    /// Cap concurrent callers, like a connection pool of this size.
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.connections = Semaphore::new(max);
        self
    }

    pub fn with_failure(mut self, failure: FailurePolicy) -> Self {
        self.failure = failure;
        self
    }

    /// Fail the `nth` count query (1-based). A run issues the initial count
    /// as call 1 and the final count as call 2.
    pub fn with_failing_count(mut self, nth: usize) -> Self {
        self.failing_count_call = Some(nth);
        self
    }

    /// Hold the connection for this long on every grouped write.
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    /// Rows present before any run, e.g. from earlier requests.
    pub fn with_existing_rows(self, rows: u64) -> Self {
        self.rows.store(rows, Ordering::SeqCst);
        self
    }

    pub fn row_count(&self) -> u64 {
        self.rows.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    /// Highest number of callers that held a connection simultaneously.
    pub fn peak_connections(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Records written by this store, in write order.
    pub async fn records(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        if self.failure == FailurePolicy::Unreachable {
            return Err(StoreError::Connection("memory store is unreachable".to_string()));
        }
        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = f.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn apply(&self, records: &[Record]) {
        self.records.lock().await.extend_from_slice(records);
        self.rows.fetch_add(records.len() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn count_rows(&self) -> Result<u64, StoreError> {
        let call = self.count_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_connection(async {
            if self.failing_count_call == Some(call) {
                return Err(StoreError::Rejected(format!("count query {call} failed")));
            }
            Ok(self.row_count())
        })
        .await
    }

    async fn insert_records(&self, records: &[Record]) -> Result<u64, StoreError> {
        let call = self.insert_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_connection(async {
            if !self.write_latency.is_zero() {
                tokio::time::sleep(self.write_latency).await;
            }
            match self.failure {
                FailurePolicy::RejectAll => {
                    Err(StoreError::Rejected(format!("grouped write {call} rejected")))
                }
                FailurePolicy::RejectNth { nth, applied } if nth == call => {
                    let applied = std::cmp::min(applied as usize, records.len());
                    self.apply(&records[..applied]).await;
                    Err(StoreError::Rejected(format!(
                        "grouped write {call} failed after {applied} rows"
                    )))
                }
                _ => {
                    self.apply(records).await;
                    Ok(records.len() as u64)
                }
            }
        })
        .await
    }
}
