//! PostgreSQL backend for the insert-million engine.
//!
//! Provides [`PostgreSQLStore`], a [`bulk_insert::RecordStore`] backed by a
//! bounded `deadpool-postgres` pool, together with the CLI arguments that
//! resolve into an [`bulk_insert::EngineConfig`].

pub mod args;
pub mod error;
pub mod insert;
pub mod store;

pub use args::{InsertModeChoice, PartitionChoice, PostgreSQLInsertArgs, WorkloadArgs};
pub use error::PostgreSQLStoreError;
pub use store::PostgreSQLStore;
