//! Error types for the insertion engine.

use crate::coordinator::CountStage;
use crate::outcome::InsertionOutcome;
use crate::plan::BatchRange;
use thiserror::Error;

/// Errors raised while building a batch plan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Batch size or worker count is zero.
    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),

    /// Nothing to insert.
    #[error("total record count must be greater than zero")]
    EmptyWorkload,
}

/// Errors surfaced by a [`RecordStore`](crate::store::RecordStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection could be obtained from the pool.
    #[error("connection unavailable: {0}")]
    Connection(String),

    /// The storage backend rejected or failed a statement.
    #[error("{0}")]
    Query(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The backend refused the write without an underlying driver error.
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    pub fn query<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Query(Box::new(err))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// A failure of one grouped write, as reported by a worker.
#[derive(Error, Debug)]
pub enum WriteError {
    /// The grouped write for a range failed.
    #[error("grouped write for range {range} failed: {source}")]
    Store {
        range: BatchRange,
        #[source]
        source: StoreError,
    },

    /// A worker task panicked while holding a range.
    #[error("insertion worker panicked: {0}")]
    WorkerPanicked(String),
}

/// Errors that end a run before a full report can be produced.
///
/// A run whose grouped writes failed is *not* a `RunError`: it still
/// yields a [`RunReport`](crate::coordinator::RunReport) with a failed
/// outcome and both counts.
#[derive(Error, Debug)]
pub enum RunError {
    /// Invalid configuration, detected before any storage access.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No storage connection could be established for the initial count.
    #[error("unable to connect to database: {0}")]
    Connection(#[source] StoreError),

    /// A row count query failed.
    ///
    /// For [`CountStage::After`] the insertion phase has already run and
    /// its outcome is carried here, so callers can tell "insertion failed"
    /// apart from "insertion likely succeeded but verification failed".
    #[error("error getting {stage} count: {source}")]
    Verification {
        stage: CountStage,
        outcome: Option<InsertionOutcome>,
        #[source]
        source: StoreError,
    },
}

impl From<PlanError> for RunError {
    fn from(err: PlanError) -> Self {
        RunError::Configuration(err.to_string())
    }
}
