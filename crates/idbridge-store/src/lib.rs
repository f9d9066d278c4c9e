//! IDBridge Store - SQLite status ledger
//!
//! Persists identity records and their sync-owned fields (remote linkage,
//! status, last error, last sync) in SQLite, implementing the core's
//! [`IIdentityStore`](idbridge_core::ports::IIdentityStore) port. Every
//! write is a single-row atomic read-modify-write keyed by local ID.

pub mod pool;
pub mod repository;

use thiserror::Error;

pub use pool::DatabasePool;
pub use repository::SqliteIdentityStore;

/// Errors raised by the SQLite store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened or reached
    #[error("Failed to connect to the store: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed on startup
    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type
    #[error("Failed to decode stored record: {0}")]
    Decode(String),
}
