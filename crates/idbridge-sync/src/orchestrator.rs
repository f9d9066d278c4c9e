//! Sync task orchestrator
//!
//! Schedules reconciliation attempts on a bounded worker pool:
//!
//! - submission is non-blocking and returns a per-ID acceptance manifest
//! - a per-ID registry guarantees at most one queued-or-running task per
//!   record; duplicate submissions coalesce into a rejection
//! - transient failures re-enter the queue after an exponential backoff
//!   until the retry budget is spent
//! - a sweep re-admits eligible `failed`/`pending` records and reaps
//!   attempts stranded `in_progress` by a crash
//! - a queued task can be cancelled; an in-flight attempt always runs to
//!   completion (a partial remote mutation cannot be safely aborted)

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use idbridge_core::config::SyncSettings;
use idbridge_core::domain::{LocalId, SyncOperation, SyncStatus};
use idbridge_core::ports::{IDirectoryProvider, IIdentityStore, ISyncEventSink};
use idbridge_core::usecases::{AttemptOutcome, ReconcileIdentityUseCase};

use crate::task::{RejectReason, SubmissionManifest, SyncTask};

/// Message consumed by the worker pool
enum QueueMessage {
    Run(SyncTask),
    Shutdown,
}

/// Result of a sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stuck `in_progress` records reset to `failed`
    pub reaped: usize,
    /// `failed`/`pending` records re-admitted to the queue
    pub readmitted: usize,
}

// ============================================================================
// SyncOrchestrator
// ============================================================================

/// Background job queue for reconciliation attempts
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

struct Inner {
    store: Arc<dyn IIdentityStore>,
    usecase: ReconcileIdentityUseCase,
    settings: SyncSettings,
    tx: mpsc::Sender<QueueMessage>,
    /// IDs admitted to the queue, including tasks sleeping out a backoff.
    /// Removing an entry cancels the task before it starts.
    queued: DashMap<LocalId, ()>,
    /// IDs with an attempt currently executing
    in_flight: DashMap<LocalId, ()>,
}

impl SyncOrchestrator {
    /// Starts the orchestrator and its worker pool
    pub fn start(
        directory: Arc<dyn IDirectoryProvider>,
        store: Arc<dyn IIdentityStore>,
        events: Arc<dyn ISyncEventSink>,
        settings: SyncSettings,
    ) -> Self {
        let worker_count = settings.workers.max(1);
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));

        let usecase = ReconcileIdentityUseCase::new(
            directory,
            store.clone(),
            events,
            settings.clone(),
        );

        let inner = Arc::new(Inner {
            store,
            usecase,
            settings,
            tx,
            queued: DashMap::new(),
            in_flight: DashMap::new(),
        });

        info!(workers = worker_count, "Starting sync orchestrator");

        let rx = Arc::new(Mutex::new(rx));
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                inner.clone(),
                rx.clone(),
                worker_id,
            )));
        }

        Self {
            inner,
            workers: std::sync::Mutex::new(workers),
            worker_count,
        }
    }

    /// Submits a single record for the given operation
    ///
    /// Non-blocking: the task is admitted to the queue or rejected with a
    /// reason; execution happens asynchronously on the worker pool.
    pub async fn submit(
        &self,
        id: LocalId,
        operation: SyncOperation,
        force: bool,
    ) -> Result<(), RejectReason> {
        self.inner.admit(id, operation, force).await
    }

    /// Submits a set of records, fanning out independently
    ///
    /// No ordering guarantee or cross-ID atomicity: each ID's outcome is
    /// independent and the manifest reports admission only.
    pub async fn submit_bulk(
        &self,
        ids: &[LocalId],
        operation: SyncOperation,
        force: bool,
    ) -> SubmissionManifest {
        let mut manifest = SubmissionManifest::default();
        for &id in ids {
            match self.inner.admit(id, operation, force).await {
                Ok(()) => manifest.accept(id),
                Err(reason) => manifest.reject(id, reason),
            }
        }
        info!(
            accepted = manifest.accepted.len(),
            rejected = manifest.rejected.len(),
            %operation,
            "Bulk submission processed"
        );
        manifest
    }

    /// Cancels a queued (not yet started) task
    ///
    /// Returns true if a task was cancelled. An in-flight attempt is never
    /// interrupted.
    pub fn cancel(&self, id: LocalId) -> bool {
        let cancelled = self.inner.queued.remove(&id).is_some();
        if cancelled {
            info!(%id, "Cancelled queued sync task");
        }
        cancelled
    }

    /// Re-admits eligible retryable records and reaps stuck attempts
    ///
    /// - `in_progress` rows older than the stale threshold with no live
    ///   attempt are reset to `failed` (interrupted by a crash or restart)
    /// - `failed` and `pending` rows older than the sweep minimum age are
    ///   re-submitted with a fresh retry budget
    pub async fn sweep(&self) -> anyhow::Result<SweepReport> {
        let mut report = SweepReport::default();

        // Both cutoffs are taken up front so a record reaped in this pass
        // is not immediately re-admitted by the same pass
        let stale_cutoff = Utc::now()
            - chrono::Duration::seconds(self.inner.settings.stale_in_progress_secs as i64);
        let retry_cutoff =
            Utc::now() - chrono::Duration::seconds(self.inner.settings.sweep_min_age_secs as i64);
        for id in self
            .inner
            .store
            .list_by_status_older_than(SyncStatus::InProgress, stale_cutoff)
            .await?
        {
            if self.inner.in_flight.contains_key(&id) {
                continue;
            }
            warn!(%id, "Reaping attempt stranded in progress");
            self.inner
                .store
                .mark_failed(id, "sync attempt was interrupted — reset by sweep")
                .await?;
            report.reaped += 1;
        }

        // Re-admit retryable records
        for status in [SyncStatus::Failed, SyncStatus::Pending] {
            for id in self
                .inner
                .store
                .list_by_status_older_than(status, retry_cutoff)
                .await?
            {
                if self
                    .inner
                    .admit(id, SyncOperation::Sync, false)
                    .await
                    .is_ok()
                {
                    report.readmitted += 1;
                }
            }
        }

        info!(
            reaped = report.reaped,
            readmitted = report.readmitted,
            "Sweep completed"
        );
        Ok(report)
    }

    /// Stops the worker pool after the queue drains its shutdown markers
    pub async fn shutdown(&self) {
        info!("Shutting down sync orchestrator");
        for _ in 0..self.worker_count {
            if self.inner.tx.send(QueueMessage::Shutdown).await.is_err() {
                break;
            }
        }

        let workers = {
            let mut guard = self.workers.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };
        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync worker ended abnormally");
            }
        }
    }
}

// ============================================================================
// Admission gate
// ============================================================================

impl Inner {
    /// Checks the gate and admits a first-attempt task to the queue
    async fn admit(
        &self,
        id: LocalId,
        operation: SyncOperation,
        force: bool,
    ) -> Result<(), RejectReason> {
        // Reserve the queued slot first so concurrent submissions coalesce
        if self.queued.insert(id, ()).is_some() {
            debug!(%id, "Submission coalesced: task already queued");
            return Err(RejectReason::AlreadyQueued);
        }

        let admitted = self.check_gate(id, force).await;
        if let Err(reason) = admitted {
            self.queued.remove(&id);
            debug!(%id, %reason, "Submission rejected");
            return Err(reason);
        }

        let task = SyncTask::new(id, operation, force);
        if self.tx.try_send(QueueMessage::Run(task)).is_err() {
            self.queued.remove(&id);
            warn!(%id, "Submission rejected: sync queue full");
            return Err(RejectReason::QueueFull);
        }

        debug!(%id, %operation, force, "Task admitted to sync queue");
        Ok(())
    }

    /// Eligibility check: record exists, no attempt in flight, and sync is
    /// enabled unless forced. Force is an explicit operator action, so it
    /// also re-enables an opted-out record before admitting it.
    async fn check_gate(&self, id: LocalId, force: bool) -> Result<(), RejectReason> {
        if self.in_flight.contains_key(&id) {
            return Err(RejectReason::AlreadyInProgress);
        }

        let record = match self.store.get_record(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return Err(RejectReason::UnknownRecord),
            Err(e) => {
                error!(%id, error = %e, "Store failure during admission");
                return Err(RejectReason::UnknownRecord);
            }
        };

        if record.sync_status == SyncStatus::InProgress {
            return Err(RejectReason::AlreadyInProgress);
        }

        let disabled = !record.sync_enabled || record.sync_status == SyncStatus::Disabled;
        if disabled {
            if !force {
                return Err(RejectReason::SyncDisabled);
            }
            // Forced submissions re-enable the record (moving it to
            // pending) so the attempt can be admitted by the ledger too
            if let Err(e) = self.store.set_sync_enabled(id, true).await {
                error!(%id, error = %e, "Failed to re-enable record for forced sync");
                return Err(RejectReason::SyncDisabled);
            }
        }

        Ok(())
    }

}

// ============================================================================
// Task execution
// ============================================================================

/// Worker loop: pulls tasks from the shared receiver until shutdown
async fn worker_loop(
    inner: Arc<Inner>,
    rx: Arc<Mutex<mpsc::Receiver<QueueMessage>>>,
    worker_id: usize,
) {
    debug!(worker_id, "Sync worker started");

    loop {
        // Hold the receiver lock only while waiting for the next message,
        // so other workers pull tasks while this one executes
        let message = { rx.lock().await.recv().await };

        match message {
            Some(QueueMessage::Run(task)) => run_task(&inner, task).await,
            Some(QueueMessage::Shutdown) | None => break,
        }
    }

    debug!(worker_id, "Sync worker stopped");
}

/// Runs one task to completion and routes its retry outcome
async fn run_task(inner: &Arc<Inner>, task: SyncTask) {
    // A missing queued entry means the task was cancelled while waiting
    if !inner.queued.contains_key(&task.local_id) {
        debug!(id = %task.local_id, "Skipping cancelled task");
        return;
    }

    if inner.in_flight.insert(task.local_id, ()).is_some() {
        // The admission gate makes this unreachable; refuse the duplicate
        // rather than double-execute
        warn!(id = %task.local_id, "Duplicate in-flight task dropped");
        return;
    }

    // The id stays registered (queued, then in-flight) for the whole
    // handover, so the admission gate never sees a gap
    inner.queued.remove(&task.local_id);

    let outcome = inner
        .usecase
        .execute(task.local_id, task.operation, task.attempt)
        .await;

    // The execution slot is released before any re-enqueue so the retry's
    // own admission never collides with this attempt's registration
    inner.in_flight.remove(&task.local_id);

    match outcome {
        Err(e) => {
            error!(id = %task.local_id, error = %e, "Attempt aborted by store failure");
        }
        Ok(AttemptOutcome::RetryBackoff { message }) => {
            schedule_retry(inner, task, &message);
        }
        Ok(AttemptOutcome::RetryNow { message }) => {
            requeue_now(inner, task, &message);
        }
        Ok(outcome) => {
            debug!(id = %task.local_id, ?outcome, "Task finished");
        }
    }
}

/// Re-enqueues a transient failure after its backoff delay
fn schedule_retry(inner: &Arc<Inner>, task: SyncTask, message: &str) {
    let delay = inner.settings.backoff_delay(task.attempt);
    let next = SyncTask {
        attempt: task.attempt + 1,
        ..task
    };

    info!(
        id = %next.local_id,
        attempt = next.attempt,
        delay_secs = delay.as_secs(),
        error = message,
        "Scheduling retry with backoff"
    );

    inner.queued.insert(next.local_id, ());
    let inner = inner.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // Cancelled during the backoff window
        if !inner.queued.contains_key(&next.local_id) {
            return;
        }
        if inner.tx.send(QueueMessage::Run(next)).await.is_err() {
            debug!(id = %next.local_id, "Retry dropped: orchestrator shut down");
            inner.queued.remove(&next.local_id);
        }
    });
}

/// Re-enqueues immediately after stale-link recovery
///
/// The linkage was cleared, so the follow-up runs as a fresh sync (which
/// will create) and keeps its attempt count: the internal restart is not
/// charged against the retry budget.
fn requeue_now(inner: &Arc<Inner>, task: SyncTask, message: &str) {
    info!(id = %task.local_id, reason = message, "Re-queueing as fresh create");

    let next = SyncTask {
        operation: SyncOperation::Sync,
        ..task
    };

    inner.queued.insert(next.local_id, ());
    if inner.tx.try_send(QueueMessage::Run(next)).is_err() {
        inner.queued.remove(&next.local_id);
        warn!(id = %next.local_id, "Could not re-queue after stale-link recovery: queue full");
    }
}
