//! Concurrent batch insertion engine.
//!
//! The engine splits a fixed workload of synthetic records into contiguous
//! index ranges and writes every range as one grouped operation through a
//! [`RecordStore`], using a fixed number of concurrent workers.
//!
//! # Architecture
//!
//! ```text
//!  EngineConfig
//!       │
//!       ▼
//! ┌────────────────┐  count (before)   ┌──────────────┐
//! │ RunCoordinator │ ────────────────▶ │ RecordStore  │
//! │                │                   │ (pool-backed)│
//! │  plan()        │                   └──────▲───────┘
//! │    │           │                          │ insert_records
//! │    ▼           │   ┌─────────────────┐    │
//! │  WorkerPool ───┼──▶│ worker 0..N     │────┘
//! │    │           │   └───────┬─────────┘
//! │    ▼           │           │ WorkerReport (mpsc)
//! │  ErrorAggregator ◀─────────┘
//! │    │           │
//! │    ▼           │  count (after)
//! │  RunReport     │ ────────────────▶ RecordStore
//! └────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bulk_insert::testing::MemoryStore;
//! use bulk_insert::{EngineConfig, RunCoordinator};
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryStore::new());
//! let config = EngineConfig::builder("memory://")
//!     .total_records(25)
//!     .batch_size(10)
//!     .num_workers(2)
//!     .build();
//!
//! let report = RunCoordinator::new(config, store).run().await.unwrap();
//! assert_eq!(report.records_inserted, 25);
//! assert!(report.is_success());
//! # });
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod plan;
pub mod record;
pub mod store;
pub mod testing;
pub mod worker;

pub use config::{EngineConfig, EngineConfigBuilder, InsertMode, PartitionKind};
pub use coordinator::{CountStage, RunCoordinator, RunReport, RunState};
pub use error::{PlanError, RunError, StoreError, WriteError};
pub use outcome::{ErrorAggregator, InsertionOutcome, WorkerReport};
pub use plan::{plan, BatchPlan, BatchRange, PartitionStrategy};
pub use record::{generate_range, Record};
pub use store::RecordStore;
pub use worker::WorkerPool;
