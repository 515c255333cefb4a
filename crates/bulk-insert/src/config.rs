//! Resolved engine configuration.

use crate::error::RunError;
use crate::plan::PartitionStrategy;
use std::fmt;

/// Default number of records inserted per run.
pub const DEFAULT_TOTAL_RECORDS: u64 = 1_000_000;

/// Default number of records per grouped write.
pub const DEFAULT_BATCH_SIZE: u64 = 10_000;

/// Default number of concurrent insertion workers.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// Default target table.
pub const DEFAULT_TABLE: &str = "users";

/// PostgreSQL accepts at most this many bind parameters per statement.
pub const MAX_BIND_PARAMETERS: u64 = 65_535;

/// Bind parameters per record (`id`, `email`).
pub const PARAMETERS_PER_RECORD: u64 = 2;

/// Which dimension drives range sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionKind {
    /// Fixed-size ranges of `batch_size` records.
    #[default]
    BatchSize,
    /// One range per worker.
    PerWorker,
}

/// How a grouped write is sent to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// One `INSERT ... VALUES (..), (..), ...` statement per range.
    #[default]
    MultiRow,
    /// One single-row `INSERT` per record, pipelined on one connection.
    Pipeline,
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKind::BatchSize => write!(f, "batch-size"),
            PartitionKind::PerWorker => write!(f, "per-worker"),
        }
    }
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertMode::MultiRow => write!(f, "multi-row"),
            InsertMode::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// Everything a run needs, resolved before the engine starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub connection_string: String,
    pub table: String,
    pub total_records: u64,
    pub batch_size: u64,
    pub num_workers: usize,
    /// Maximum connections in the shared pool.
    pub pool_size: usize,
    pub partition: PartitionKind,
    pub insert_mode: InsertMode,
}

impl EngineConfig {
    pub fn builder(connection_string: impl Into<String>) -> EngineConfigBuilder {
        EngineConfigBuilder::new(connection_string)
    }

    pub fn strategy(&self) -> PartitionStrategy {
        match self.partition {
            PartitionKind::BatchSize => PartitionStrategy::BatchSize(self.batch_size),
            PartitionKind::PerWorker => PartitionStrategy::PerWorker(self.num_workers as u64),
        }
    }

    /// Largest range the configured plan can produce.
    pub fn max_range_len(&self) -> u64 {
        match self.partition {
            PartitionKind::BatchSize => std::cmp::min(self.batch_size, self.total_records),
            PartitionKind::PerWorker => {
                let parts = std::cmp::min(self.num_workers as u64, self.total_records).max(1);
                self.total_records.div_ceil(parts)
            }
        }
    }

    /// Reject any value that would change behavior silently at runtime.
    pub fn validate(&self) -> Result<(), RunError> {
        if self.connection_string.trim().is_empty() {
            return Err(config_error("database connection string is not set"));
        }
        if self.total_records == 0 {
            return Err(config_error("total record count must be greater than zero"));
        }
        if self.batch_size == 0 {
            return Err(config_error("batch size must be greater than zero"));
        }
        if self.num_workers == 0 {
            return Err(config_error("worker count must be greater than zero"));
        }
        if self.pool_size < self.num_workers {
            return Err(config_error(format!(
                "pool size {} is smaller than worker count {}; workers would serialize on connections",
                self.pool_size, self.num_workers
            )));
        }
        validate_table_name(&self.table)?;

        if self.insert_mode == InsertMode::MultiRow {
            let params = self.max_range_len() * PARAMETERS_PER_RECORD;
            if params > MAX_BIND_PARAMETERS {
                return Err(config_error(format!(
                    "a range of {} records needs {} bind parameters, above the limit of {}; \
                     lower the batch size or use the pipeline insert mode",
                    self.max_range_len(),
                    params,
                    MAX_BIND_PARAMETERS
                )));
            }
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> RunError {
    RunError::Configuration(message.into())
}

/// Table names are quoted into SQL, so only plain identifiers are accepted.
pub fn validate_table_name(table: &str) -> Result<(), RunError> {
    let valid = !table.is_empty()
        && table.len() <= 63
        && table
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(config_error(format!("invalid table name '{table}'")))
    }
}

/// Builder for [`EngineConfig`], defaulting to the stock workload.
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
    pool_size: Option<usize>,
}

impl EngineConfigBuilder {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            config: EngineConfig {
                connection_string: connection_string.into(),
                table: DEFAULT_TABLE.to_string(),
                total_records: DEFAULT_TOTAL_RECORDS,
                batch_size: DEFAULT_BATCH_SIZE,
                num_workers: DEFAULT_NUM_WORKERS,
                pool_size: DEFAULT_NUM_WORKERS,
                partition: PartitionKind::default(),
                insert_mode: InsertMode::default(),
            },
            pool_size: None,
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.table = table.into();
        self
    }

    pub fn total_records(mut self, total: u64) -> Self {
        self.config.total_records = total;
        self
    }

    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = workers;
        self
    }

    /// Pool size; defaults to the worker count when not set.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn partition(mut self, partition: PartitionKind) -> Self {
        self.config.partition = partition;
        self
    }

    pub fn insert_mode(mut self, mode: InsertMode) -> Self {
        self.config.insert_mode = mode;
        self
    }

    pub fn build(mut self) -> EngineConfig {
        self.config.pool_size = self.pool_size.unwrap_or(self.config.num_workers);
        self.config
    }
}
