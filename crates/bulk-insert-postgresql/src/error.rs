//! Error types for the PostgreSQL store.

use thiserror::Error;

/// Errors that can occur while setting up the PostgreSQL store.
#[derive(Error, Debug)]
pub enum PostgreSQLStoreError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pool construction or checkout error.
    #[error("Connection error: {0}")]
    Connection(String),
}
