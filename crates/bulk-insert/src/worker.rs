//! Fixed-size pool of insertion workers.
//!
//! Workers pull ranges from a shared queue, generate the records of each
//! range and hand them to the store as one grouped write. A worker that hits
//! a write error reports it and stops claiming ranges; its siblings keep
//! going. The pool returns only after every worker has been joined.

use crate::outcome::{ErrorAggregator, InsertionOutcome, WorkerReport};
use crate::plan::{BatchPlan, BatchRange};
use crate::record::generate_range;
use crate::store::RecordStore;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

type RangeQueue = Arc<Mutex<VecDeque<BatchRange>>>;

/// Runs a [`BatchPlan`] against a store with at most `num_workers` grouped
/// writes in flight.
pub struct WorkerPool<S: RecordStore> {
    store: Arc<S>,
    num_workers: usize,
}

impl<S: RecordStore> WorkerPool<S> {
    pub fn new(store: Arc<S>, num_workers: usize) -> Self {
        Self { store, num_workers }
    }

    /// Execute every range of the plan and aggregate the results.
    pub async fn run(&self, plan: &BatchPlan) -> InsertionOutcome {
        let queue: RangeQueue = Arc::new(Mutex::new(plan.ranges.iter().copied().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // No point spawning workers that can never claim a range.
        let workers = std::cmp::min(self.num_workers, plan.len());
        info!(
            "Dispatching {} ranges to {} workers",
            plan.len(),
            workers
        );

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            tasks.spawn(run_worker(
                worker,
                Arc::clone(&self.store),
                Arc::clone(&queue),
                tx.clone(),
            ));
        }
        // The channel closes once the last worker drops its sender.
        drop(tx);

        let mut aggregator = ErrorAggregator::new(plan.len());
        while let Some(report) = rx.recv().await {
            aggregator.record(report);
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                aggregator.record_panic(e.to_string());
            }
        }

        let unclaimed = queue.lock().await.len();
        aggregator.finish(unclaimed)
    }
}

async fn run_worker<S: RecordStore>(
    worker: usize,
    store: Arc<S>,
    queue: RangeQueue,
    reports: mpsc::UnboundedSender<WorkerReport>,
) {
    let mut written = 0u64;
    loop {
        let Some(range) = queue.lock().await.pop_front() else {
            break;
        };

        let records = generate_range(range);
        let start = Instant::now();
        match store.insert_records(&records).await {
            Ok(rows) => {
                written += rows;
                debug!(
                    "Worker {} wrote range {} ({} rows) in {:?}",
                    worker,
                    range,
                    rows,
                    start.elapsed()
                );
                // The receiver outlives every worker, so a send can only fail
                // if the pool itself was dropped mid-run.
                let _ = reports.send(WorkerReport::Succeeded {
                    worker,
                    range,
                    rows,
                });
            }
            Err(error) => {
                let _ = reports.send(WorkerReport::Failed {
                    worker,
                    range,
                    error,
                });
                break;
            }
        }
    }
    debug!("Worker {} finished after writing {} rows", worker, written);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{plan, PartitionStrategy};
    use crate::testing::{FailurePolicy, MemoryStore};

    #[tokio::test]
    async fn test_every_range_processed_for_any_worker_count() {
        let plan = plan(97, PartitionStrategy::BatchSize(7)).unwrap();
        for workers in [1, 2, 3, 8, 14, 50] {
            let store = Arc::new(MemoryStore::new());
            let outcome = WorkerPool::new(Arc::clone(&store), workers).run(&plan).await;

            assert!(outcome.is_success(), "workers={workers}");
            assert_eq!(outcome.ranges_succeeded, plan.len());
            assert_eq!(outcome.rows_written, 97);
            assert_eq!(store.row_count(), 97);
        }
    }

    #[tokio::test]
    async fn test_single_worker_stops_at_first_failure() {
        let plan = plan(50, PartitionStrategy::BatchSize(10)).unwrap();
        let store = Arc::new(MemoryStore::new().with_failure(FailurePolicy::reject_nth(3)));
        let outcome = WorkerPool::new(Arc::clone(&store), 1).run(&plan).await;

        assert_eq!(outcome.ranges_succeeded, 2);
        assert_eq!(outcome.ranges_failed, 1);
        assert_eq!(outcome.ranges_unclaimed, 2);
        assert_eq!(store.insert_calls(), 3);
        assert_eq!(store.row_count(), 20);
    }

    #[tokio::test]
    async fn test_siblings_continue_after_failure() {
        let plan = plan(100, PartitionStrategy::BatchSize(10)).unwrap();
        let store = Arc::new(MemoryStore::new().with_failure(FailurePolicy::reject_nth(1)));
        let outcome = WorkerPool::new(Arc::clone(&store), 4).run(&plan).await;

        // Exactly one write fails; the three healthy workers drain the rest.
        assert_eq!(outcome.ranges_failed, 1);
        assert_eq!(outcome.ranges_succeeded, 9);
        assert_eq!(outcome.ranges_unclaimed, 0);
        assert_eq!(store.row_count(), 90);
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_every_worker_failing_leaves_unclaimed_ranges() {
        let plan = plan(100, PartitionStrategy::BatchSize(10)).unwrap();
        let store = Arc::new(MemoryStore::new().with_failure(FailurePolicy::RejectAll));
        let outcome = WorkerPool::new(Arc::clone(&store), 3).run(&plan).await;

        assert_eq!(outcome.ranges_failed, 3);
        assert_eq!(outcome.ranges_unclaimed, 7);
        assert_eq!(outcome.ranges_succeeded, 0);
        assert_eq!(store.row_count(), 0);
    }
}
