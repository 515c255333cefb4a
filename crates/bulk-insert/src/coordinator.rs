//! Orchestration of a single insertion run.
//!
//! ```text
//! Idle ──▶ Planning ──▶ Inserting ──▶ Verifying ──▶ Done
//!   │          │                          │
//!   └──────────┴──────────▶ Failed ◀──────┘
//! ```
//!
//! The initial row count is taken before any worker is spawned and the final
//! count after every worker has been joined. A connection failure on the
//! initial count ends the run before `Inserting`.

use crate::config::EngineConfig;
use crate::error::{RunError, StoreError};
use crate::outcome::InsertionOutcome;
use crate::plan::plan;
use crate::store::RecordStore;
use crate::worker::WorkerPool;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Planning,
    Inserting,
    Verifying,
    Done,
    Failed,
}

/// Which side of the run a row count brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CountStage {
    Before,
    After,
}

impl fmt::Display for CountStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountStage::Before => write!(f, "initial"),
            CountStage::After => write!(f, "final"),
        }
    }
}

/// Terminal artifact of a run that reached verification.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub initial_count: u64,
    pub final_count: u64,
    /// Observed row delta, `final_count - initial_count`. May differ from
    /// the planned workload when writes failed, were partially applied, or
    /// other writers touched the table.
    pub records_inserted: i64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub outcome: InsertionOutcome,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Initial count: {}, Final count: {}, Records inserted: {}, Time taken: {:?}",
            self.initial_count,
            self.final_count,
            self.records_inserted,
            self.elapsed
        )
    }
}

fn serialize_millis<S>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Drives one run: validate and plan, count, insert, count again.
pub struct RunCoordinator<S: RecordStore> {
    config: EngineConfig,
    store: Arc<S>,
    state: RunState,
}

impl<S: RecordStore> RunCoordinator<S> {
    pub fn new(config: EngineConfig, store: Arc<S>) -> Self {
        Self {
            config,
            store,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Execute the run to completion.
    ///
    /// Returns `Ok` whenever both counts were obtained, even if grouped
    /// writes failed; check [`RunReport::is_success`].
    pub async fn run(&mut self) -> Result<RunReport, RunError> {
        let result = self.execute().await;
        match &result {
            Ok(report) if report.is_success() => self.transition(RunState::Done),
            Ok(report) => {
                warn!(
                    "Run finished with failures: {}/{} ranges failed, {} unclaimed",
                    report.outcome.ranges_failed,
                    report.outcome.ranges_planned,
                    report.outcome.ranges_unclaimed
                );
                self.transition(RunState::Done);
            }
            Err(e) => {
                error!("Run failed in state {:?}: {}", self.state, e);
                self.transition(RunState::Failed);
            }
        }
        result
    }

    async fn execute(&mut self) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        let start = Instant::now();

        self.transition(RunState::Planning);
        self.config.validate()?;
        let plan = plan(self.config.total_records, self.config.strategy())?;
        info!(
            "Planned {} records into {} ranges (max {} per range, {} workers, {} mode)",
            plan.total_records,
            plan.len(),
            plan.max_range_len(),
            self.config.num_workers,
            self.config.insert_mode
        );

        let initial_count = self
            .store
            .count_rows()
            .await
            .map_err(|e: StoreError| {
                if e.is_connection() {
                    RunError::Connection(e)
                } else {
                    RunError::Verification {
                        stage: CountStage::Before,
                        outcome: None,
                        source: e,
                    }
                }
            })?;
        debug!("Initial row count: {}", initial_count);

        self.transition(RunState::Inserting);
        let pool = WorkerPool::new(Arc::clone(&self.store), self.config.num_workers);
        let outcome = pool.run(&plan).await;

        self.transition(RunState::Verifying);
        let final_count = match self.store.count_rows().await {
            Ok(count) => count,
            Err(source) => {
                return Err(RunError::Verification {
                    stage: CountStage::After,
                    outcome: Some(outcome),
                    source,
                })
            }
        };

        let report = RunReport {
            started_at,
            initial_count,
            final_count,
            records_inserted: final_count as i64 - initial_count as i64,
            elapsed: start.elapsed(),
            outcome,
        };
        info!(
            "Insertion complete: {} ({} rows written by workers)",
            report.summary(),
            report.outcome.rows_written
        );
        Ok(report)
    }
}
