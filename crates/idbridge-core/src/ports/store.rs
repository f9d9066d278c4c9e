//! Identity store port (driven/secondary port)
//!
//! Interface to the user store for the fields the engine consumes (identity
//! attributes) and the fields it owns (remote linkage, sync status, last
//! error, last sync). Each write method is a single atomic read-modify-write
//! on the row keyed by local ID.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, ORM-backed user store, etc.) and don't need domain-level
//!   classification.
//! - Status writes are last-write-wins; no history is kept beyond the
//!   single `last_error`/`last_sync` pair. Operational debugging relies on
//!   the structured event stream, not this ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{IdentityRecord, LocalId, RemoteObjectId, SyncStatus};

/// A recent terminal failure, as surfaced on the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEntry {
    /// Local ID of the failed record
    pub id: LocalId,
    /// Email for operator display
    pub email: String,
    /// The terminal error message
    pub error: String,
    /// When the failure was recorded
    pub at: DateTime<Utc>,
}

/// Port trait for identity-record persistence
#[async_trait::async_trait]
pub trait IIdentityStore: Send + Sync {
    /// Retrieves a record by its local ID
    async fn get_record(&self, id: LocalId) -> anyhow::Result<Option<IdentityRecord>>;

    /// Saves a record (insert or update), including the engine-owned fields
    async fn upsert_record(&self, record: &IdentityRecord) -> anyhow::Result<()>;

    /// Marks an attempt as started: status `in_progress`, `last_error`
    /// cleared
    ///
    /// Fails if the record is missing or its current status does not admit
    /// an attempt (`disabled` or already `in_progress`), enforcing the
    /// transition rules at the storage layer as well.
    async fn mark_in_progress(&self, id: LocalId) -> anyhow::Result<()>;

    /// Records a successful attempt: linkage, status `synced`, `last_sync`
    async fn mark_synced(
        &self,
        id: LocalId,
        remote_id: Option<&RemoteObjectId>,
        at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Records a terminal failure: status `failed`, `last_error` populated
    async fn mark_failed(&self, id: LocalId, error: &str) -> anyhow::Result<()>;

    /// Sets the status without touching the other engine-owned fields
    async fn set_status(&self, id: LocalId, status: SyncStatus) -> anyhow::Result<()>;

    /// Clears the remote linkage and moves the record to `new_status`
    ///
    /// Used for stale-link recovery (`pending`) and unlinking (`unsynced`).
    async fn clear_remote_link(&self, id: LocalId, new_status: SyncStatus) -> anyhow::Result<()>;

    /// Enables or disables sync for a record; disabling also moves the
    /// status to `disabled`, enabling moves it to `pending`
    async fn set_sync_enabled(&self, id: LocalId, enabled: bool) -> anyhow::Result<()>;

    /// Lists local IDs currently in the given status
    async fn list_by_status(&self, status: SyncStatus) -> anyhow::Result<Vec<LocalId>>;

    /// Lists IDs in the given status whose last write is older than the
    /// given moment (used by the retry sweep and the stuck-attempt reaper)
    async fn list_by_status_older_than(
        &self,
        status: SyncStatus,
        older_than: DateTime<Utc>,
    ) -> anyhow::Result<Vec<LocalId>>;

    /// Counts records grouped by status name
    async fn count_by_status(&self) -> anyhow::Result<HashMap<String, u64>>;

    /// Most recent terminal failures, newest first
    async fn recent_failures(&self, limit: u32) -> anyhow::Result<Vec<FailureEntry>>;
}
