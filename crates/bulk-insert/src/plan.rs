//! Work partitioning for a single insertion run.
//!
//! Splits the global index space `[0, total_records)` into contiguous,
//! non-overlapping ranges. Each range becomes one grouped write.

use crate::error::PlanError;
use std::fmt;

/// A contiguous, non-empty slice `[start, start + count)` of the index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchRange {
    pub start: u64,
    pub count: u64,
}

impl BatchRange {
    pub fn new(start: u64, count: u64) -> Self {
        Self { start, count }
    }

    /// Exclusive end of the range.
    pub fn end(&self) -> u64 {
        self.start + self.count
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

/// How the workload is divided into ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStrategy {
    /// Stride through the index space in steps of this many records.
    /// The final range is truncated.
    BatchSize(u64),
    /// Produce one range per worker, sized as evenly as possible.
    ///
    /// The first `total % workers` ranges carry one extra record so no
    /// record is dropped. When there are fewer records than workers, only
    /// `total` single-record ranges are produced.
    PerWorker(u64),
}

/// An ordered set of ranges covering `[0, total_records)` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub total_records: u64,
    pub ranges: Vec<BatchRange>,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Size of the largest range.
    pub fn max_range_len(&self) -> u64 {
        self.ranges.iter().map(|r| r.count).max().unwrap_or(0)
    }
}

/// Build the plan for `total_records` using `strategy`.
pub fn plan(total_records: u64, strategy: PartitionStrategy) -> Result<BatchPlan, PlanError> {
    if total_records == 0 {
        return Err(PlanError::EmptyWorkload);
    }

    let ranges = match strategy {
        PartitionStrategy::BatchSize(0) => return Err(PlanError::ZeroSize("batch size")),
        PartitionStrategy::PerWorker(0) => return Err(PlanError::ZeroSize("worker count")),
        PartitionStrategy::BatchSize(batch_size) => by_batch_size(total_records, batch_size),
        PartitionStrategy::PerWorker(workers) => by_worker_count(total_records, workers),
    };

    Ok(BatchPlan {
        total_records,
        ranges,
    })
}

fn by_batch_size(total: u64, batch_size: u64) -> Vec<BatchRange> {
    let mut ranges = Vec::with_capacity(total.div_ceil(batch_size) as usize);
    let mut start = 0;
    while start < total {
        let count = std::cmp::min(batch_size, total - start);
        ranges.push(BatchRange::new(start, count));
        start += count;
    }
    ranges
}

fn by_worker_count(total: u64, workers: u64) -> Vec<BatchRange> {
    let parts = std::cmp::min(workers, total);
    let base = total / parts;
    let remainder = total % parts;

    let mut ranges = Vec::with_capacity(parts as usize);
    let mut start = 0;
    for i in 0..parts {
        let count = base + u64::from(i < remainder);
        ranges.push(BatchRange::new(start, count));
        start += count;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check that the ranges tile `[0, total)` in order with no empty range.
    fn assert_exact_partition(plan: &BatchPlan) {
        let mut expected_start = 0;
        for range in &plan.ranges {
            assert!(range.count > 0, "empty range {range}");
            assert_eq!(range.start, expected_start, "gap or overlap at {range}");
            expected_start = range.end();
        }
        assert_eq!(expected_start, plan.total_records);
    }

    #[test]
    fn test_batch_size_example() {
        let plan = plan(25, PartitionStrategy::BatchSize(10)).unwrap();
        assert_eq!(
            plan.ranges,
            vec![
                BatchRange::new(0, 10),
                BatchRange::new(10, 10),
                BatchRange::new(20, 5),
            ]
        );
    }

    #[test]
    fn test_batch_size_exact_multiple() {
        let plan = plan(1_000_000, PartitionStrategy::BatchSize(10_000)).unwrap();
        assert_eq!(plan.len(), 100);
        assert_eq!(plan.max_range_len(), 10_000);
        assert_exact_partition(&plan);
    }

    #[test]
    fn test_batch_size_larger_than_total() {
        let plan = plan(7, PartitionStrategy::BatchSize(100)).unwrap();
        assert_eq!(plan.ranges, vec![BatchRange::new(0, 7)]);
    }

    #[test]
    fn test_partitions_cover_interval_for_many_inputs() {
        for total in 1..=64u64 {
            for size in 1..=20u64 {
                assert_exact_partition(&plan(total, PartitionStrategy::BatchSize(size)).unwrap());
                assert_exact_partition(&plan(total, PartitionStrategy::PerWorker(size)).unwrap());
            }
        }
    }

    #[test]
    fn test_per_worker_spreads_remainder() {
        let plan = plan(10, PartitionStrategy::PerWorker(4)).unwrap();
        let counts: Vec<u64> = plan.ranges.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![3, 3, 2, 2]);
        assert_exact_partition(&plan);
    }

    #[test]
    fn test_per_worker_does_not_drop_remainder() {
        let plan = plan(1_000_003, PartitionStrategy::PerWorker(4)).unwrap();
        let total: u64 = plan.ranges.iter().map(|r| r.count).sum();
        assert_eq!(total, 1_000_003);
    }

    #[test]
    fn test_per_worker_fewer_records_than_workers() {
        let plan = plan(3, PartitionStrategy::PerWorker(8)).unwrap();
        assert_eq!(plan.len(), 3);
        assert!(plan.ranges.iter().all(|r| r.count == 1));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        assert_eq!(
            plan(10, PartitionStrategy::BatchSize(0)),
            Err(PlanError::ZeroSize("batch size"))
        );
        assert_eq!(
            plan(10, PartitionStrategy::PerWorker(0)),
            Err(PlanError::ZeroSize("worker count"))
        );
        assert_eq!(
            plan(0, PartitionStrategy::BatchSize(10)),
            Err(PlanError::EmptyWorkload)
        );
    }

    #[test]
    fn test_range_display() {
        assert_eq!(BatchRange::new(10, 10).to_string(), "[10, 20)");
    }
}
