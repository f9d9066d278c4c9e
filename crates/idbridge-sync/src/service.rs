//! SyncService - admin-facing facade
//!
//! Wires the orchestrator, status ledger, directory adapter, and event
//! sink into the surface the UI/admin layer consumes: submission, status,
//! dashboard, connection test, and the operator actions (reset, enable/
//! disable, unlink).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use idbridge_core::config::SyncSettings;
use idbridge_core::domain::{LocalId, RemoteObjectId, SyncOperation, SyncStatus};
use idbridge_core::ports::{FailureEntry, IDirectoryProvider, IIdentityStore, ISyncEventSink};
use idbridge_core::usecases::{ConnectionProbe, TestConnectionUseCase};

use crate::orchestrator::{SweepReport, SyncOrchestrator};
use crate::task::SubmissionManifest;

/// Per-record status view returned to the UI
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    /// Current sync status
    pub status: SyncStatus,
    /// Remote linkage, if any
    pub remote_object_id: Option<RemoteObjectId>,
    /// Last terminal error, if any
    pub last_error: Option<String>,
    /// Last successful sync timestamp, if any
    pub last_sync: Option<DateTime<Utc>>,
}

/// Aggregate view for the sync dashboard
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    /// Record counts grouped by status name
    pub counts_by_status: HashMap<String, u64>,
    /// Most recent terminal failures, newest first
    pub recent_failures: Vec<FailureEntry>,
}

/// Number of failures shown on the dashboard
const DASHBOARD_FAILURE_LIMIT: u32 = 10;

/// Facade over the sync engine for the UI/admin layer
pub struct SyncService {
    orchestrator: SyncOrchestrator,
    store: Arc<dyn IIdentityStore>,
    connection_probe: TestConnectionUseCase,
}

impl SyncService {
    /// Builds the service and starts the orchestrator's worker pool
    pub fn new(
        directory: Arc<dyn IDirectoryProvider>,
        store: Arc<dyn IIdentityStore>,
        events: Arc<dyn ISyncEventSink>,
        settings: SyncSettings,
    ) -> Self {
        let connection_probe = TestConnectionUseCase::new(directory.clone());
        let orchestrator =
            SyncOrchestrator::start(directory, store.clone(), events, settings);

        Self {
            orchestrator,
            store,
            connection_probe,
        }
    }

    /// Submits a set of records for the given operation
    ///
    /// Returns the per-ID admission manifest; outcomes land in the ledger
    /// asynchronously.
    pub async fn submit_sync(
        &self,
        ids: &[LocalId],
        operation: SyncOperation,
        force: bool,
    ) -> SubmissionManifest {
        self.orchestrator.submit_bulk(ids, operation, force).await
    }

    /// Current sync status of a record
    pub async fn get_status(&self, id: LocalId) -> anyhow::Result<Option<StatusView>> {
        let record = self.store.get_record(id).await?;
        Ok(record.map(|record| StatusView {
            status: record.sync_status,
            remote_object_id: record.remote_object_id,
            last_error: record.last_error,
            last_sync: record.last_sync,
        }))
    }

    /// Status counts and recent failures for the dashboard
    pub async fn get_dashboard(&self) -> anyhow::Result<DashboardSnapshot> {
        Ok(DashboardSnapshot {
            counts_by_status: self.store.count_by_status().await?,
            recent_failures: self.store.recent_failures(DASHBOARD_FAILURE_LIMIT).await?,
        })
    }

    /// Probes directory connectivity and credentials
    pub async fn test_connection(&self) -> ConnectionProbe {
        self.connection_probe.execute().await
    }

    /// Cancels a queued task; an in-flight attempt runs to completion
    pub fn cancel(&self, id: LocalId) -> bool {
        self.orchestrator.cancel(id)
    }

    /// Runs a retry sweep (see [`SyncOrchestrator::sweep`])
    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        self.orchestrator.sweep().await
    }

    /// Stops the worker pool
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown().await;
    }

    // ========================================================================
    // Operator actions
    // ========================================================================

    /// Resets records to `pending` with sync enabled, making "retry" always
    /// available no matter how many prior attempts failed
    pub async fn reset_to_pending(&self, ids: &[LocalId]) -> anyhow::Result<usize> {
        let mut updated = 0;
        for &id in ids {
            if self.store.get_record(id).await?.is_some() {
                self.store.set_sync_enabled(id, true).await?;
                updated += 1;
            }
        }
        info!(updated, "Reset records to pending");
        Ok(updated)
    }

    /// Enables or disables sync for records
    pub async fn set_sync_enabled(&self, ids: &[LocalId], enabled: bool) -> anyhow::Result<usize> {
        let mut updated = 0;
        for &id in ids {
            if self.store.get_record(id).await?.is_some() {
                self.store.set_sync_enabled(id, enabled).await?;
                updated += 1;
            }
        }
        info!(updated, enabled, "Changed per-record sync flag");
        Ok(updated)
    }

    /// Clears the remote linkage without touching the directory
    ///
    /// The records are treated as new on their next sync (create path).
    pub async fn remove_remote_link(&self, ids: &[LocalId]) -> anyhow::Result<usize> {
        let mut updated = 0;
        for &id in ids {
            if self.store.get_record(id).await?.is_some() {
                self.store
                    .clear_remote_link(id, SyncStatus::Pending)
                    .await?;
                updated += 1;
            }
        }
        info!(updated, "Removed remote linkage");
        Ok(updated)
    }
}
