//! Collection of per-worker results into a single run outcome.

use crate::error::{StoreError, WriteError};
use crate::plan::BatchRange;
use serde::{Serialize, Serializer};
use tracing::warn;

/// Message sent by a worker after every grouped write it attempts.
#[derive(Debug)]
pub enum WorkerReport {
    Succeeded {
        worker: usize,
        range: BatchRange,
        rows: u64,
    },
    Failed {
        worker: usize,
        range: BatchRange,
        error: StoreError,
    },
}

/// Final accounting of the insertion phase of one run.
///
/// `ranges_succeeded + ranges_failed + ranges_unclaimed == ranges_planned`
/// always holds. Unclaimed ranges are those still queued after every worker
/// stopped on a failure.
#[derive(Debug, Default, Serialize)]
pub struct InsertionOutcome {
    pub ranges_planned: usize,
    pub ranges_succeeded: usize,
    pub ranges_failed: usize,
    pub ranges_unclaimed: usize,
    /// Rows reported written by successful grouped writes.
    pub rows_written: u64,
    /// The first failure received, in completion order. Workers finish
    /// asynchronously, so which failure comes first is not deterministic
    /// when several workers fail.
    #[serde(serialize_with = "serialize_error")]
    pub first_error: Option<WriteError>,
}

impl InsertionOutcome {
    /// Ranges that reached a grouped write, whatever its result.
    ///
    /// Falls short of `ranges_planned` by exactly `ranges_unclaimed`: once
    /// every worker has stopped on a failure, the ranges still queued are
    /// never written, so they are reported as not attempted rather than
    /// as failed writes. Every planned range is still either applied,
    /// explicitly failed or explicitly unclaimed.
    pub fn ranges_attempted(&self) -> usize {
        self.ranges_succeeded + self.ranges_failed
    }

    /// True iff every planned range was written successfully.
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
            && self.ranges_failed == 0
            && self.ranges_unclaimed == 0
            && self.ranges_succeeded == self.ranges_planned
    }
}

fn serialize_error<S>(error: &Option<WriteError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Single consumer of [`WorkerReport`]s.
///
/// The first failure recorded wins; later failures are only counted.
#[derive(Debug)]
pub struct ErrorAggregator {
    outcome: InsertionOutcome,
}

impl ErrorAggregator {
    pub fn new(ranges_planned: usize) -> Self {
        Self {
            outcome: InsertionOutcome {
                ranges_planned,
                ..Default::default()
            },
        }
    }

    pub fn record(&mut self, report: WorkerReport) {
        match report {
            WorkerReport::Succeeded { rows, .. } => {
                self.outcome.ranges_succeeded += 1;
                self.outcome.rows_written += rows;
            }
            WorkerReport::Failed {
                worker,
                range,
                error,
            } => {
                warn!("Worker {} failed on range {}: {}", worker, range, error);
                self.outcome.ranges_failed += 1;
                self.keep_first(WriteError::Store {
                    range,
                    source: error,
                });
            }
        }
    }

    /// Record a worker task that ended without reporting its range.
    pub fn record_panic(&mut self, message: String) {
        warn!("Insertion worker panicked: {}", message);
        self.keep_first(WriteError::WorkerPanicked(message));
    }

    fn keep_first(&mut self, error: WriteError) {
        if self.outcome.first_error.is_none() {
            self.outcome.first_error = Some(error);
        }
    }

    /// Close the books once every worker has been joined.
    ///
    /// `unclaimed` is the number of ranges left in the queue. Any range
    /// neither reported nor unclaimed was lost to a panicked worker and is
    /// counted as failed.
    pub fn finish(mut self, unclaimed: usize) -> InsertionOutcome {
        self.outcome.ranges_unclaimed = unclaimed;
        let accounted = self.outcome.ranges_succeeded + self.outcome.ranges_failed + unclaimed;
        let lost = self.outcome.ranges_planned.saturating_sub(accounted);
        self.outcome.ranges_failed += lost;
        self.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(range: BatchRange) -> WorkerReport {
        WorkerReport::Succeeded {
            worker: 0,
            range,
            rows: range.count,
        }
    }

    fn failed(worker: usize, range: BatchRange, msg: &str) -> WorkerReport {
        WorkerReport::Failed {
            worker,
            range,
            error: StoreError::Rejected(msg.to_string()),
        }
    }

    #[test]
    fn test_all_success() {
        let mut agg = ErrorAggregator::new(2);
        agg.record(ok(BatchRange::new(0, 10)));
        agg.record(ok(BatchRange::new(10, 5)));
        let outcome = agg.finish(0);

        assert!(outcome.is_success());
        assert_eq!(outcome.rows_written, 15);
        assert_eq!(outcome.ranges_attempted(), 2);
    }

    #[test]
    fn test_first_error_is_completion_order() {
        let mut agg = ErrorAggregator::new(3);
        agg.record(failed(2, BatchRange::new(20, 10), "second worker"));
        agg.record(failed(0, BatchRange::new(0, 10), "first worker"));
        agg.record(ok(BatchRange::new(10, 10)));
        let outcome = agg.finish(0);

        assert!(!outcome.is_success());
        assert_eq!(outcome.ranges_failed, 2);
        let message = outcome.first_error.unwrap().to_string();
        assert!(message.contains("[20, 30)"), "{message}");
        assert!(message.contains("second worker"), "{message}");
    }

    #[test]
    fn test_unclaimed_ranges_are_counted() {
        let mut agg = ErrorAggregator::new(5);
        agg.record(ok(BatchRange::new(0, 1)));
        agg.record(failed(0, BatchRange::new(1, 1), "down"));
        let outcome = agg.finish(3);

        assert_eq!(outcome.ranges_unclaimed, 3);
        assert_eq!(outcome.ranges_attempted(), 2);
        assert_eq!(
            outcome.ranges_attempted() + outcome.ranges_unclaimed,
            outcome.ranges_planned
        );
        assert_eq!(
            outcome.ranges_succeeded + outcome.ranges_failed + outcome.ranges_unclaimed,
            outcome.ranges_planned
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_panicked_range_counted_as_failed() {
        let mut agg = ErrorAggregator::new(3);
        agg.record(ok(BatchRange::new(0, 1)));
        agg.record_panic("index out of bounds".to_string());
        let outcome = agg.finish(1);

        assert_eq!(outcome.ranges_failed, 1);
        assert!(matches!(
            outcome.first_error,
            Some(WriteError::WorkerPanicked(_))
        ));
    }

    #[test]
    fn test_outcome_serializes_error_as_text() {
        let mut agg = ErrorAggregator::new(1);
        agg.record(failed(0, BatchRange::new(0, 3), "nope"));
        let json = serde_json::to_value(agg.finish(0)).unwrap();

        assert_eq!(json["ranges_failed"], 1);
        assert_eq!(
            json["first_error"],
            "grouped write for range [0, 3) failed: write rejected: nope"
        );
    }
}
