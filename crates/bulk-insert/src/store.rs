//! Storage seam for the insertion engine.

use crate::error::StoreError;
use crate::record::Record;
use async_trait::async_trait;

/// A table of `(id, email)` rows behind a bounded connection pool.
///
/// Implementations acquire a connection per call and release it before
/// returning. They must be safe to call from many workers at once; no two
/// concurrent calls may share a connection.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Current number of rows in the target table.
    async fn count_rows(&self) -> Result<u64, StoreError>;

    /// Write every record as one grouped operation on a single connection.
    ///
    /// Backends may need a statement preparation round trip before the
    /// rows themselves are sent.
    ///
    /// The write is not transactional: on error some of the records may
    /// already have been applied. Returns the number of rows the backend
    /// reports as written.
    async fn insert_records(&self, records: &[Record]) -> Result<u64, StoreError>;
}
