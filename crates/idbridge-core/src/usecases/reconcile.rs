//! Identity reconciliation use case
//!
//! Drives a single sync attempt for one identity record: decides create
//! vs. update vs. no-op, applies the result through the directory port,
//! and records the outcome in the identity store. The orchestrator owns
//! scheduling, per-id mutual exclusion, and the retry queue; this use case
//! owns everything between "attempt starts" and "attempt outcome".
//!
//! Outcome routing:
//! - success → `synced`, linkage persisted, success event emitted
//! - transient directory error within budget → `pending`, caller re-enqueues
//!   with backoff
//! - transient past the budget, validation, auth, unclassified → `failed`
//!   with a human-actionable message, failure event emitted
//! - 404 on update/disable → linkage cleared, `pending`, caller re-enqueues
//!   immediately as a fresh create (not counted against the budget)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::SyncSettings;
use crate::domain::{
    DirectoryError, DomainError, IdentityRecord, LocalId, RemoteObjectId, SyncOperation,
    SyncStatus,
};
use crate::mapper::{build_create_payload, build_update_payload, generate_temp_password};
use crate::ports::{IDirectoryProvider, IIdentityStore, ISyncEventSink, SyncEvent};

// ============================================================================
// Attempt outcome
// ============================================================================

/// Result of one reconciliation attempt, as seen by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The attempt succeeded; the record is `synced`
    Synced {
        /// Remote linkage after the attempt (None for a no-op disable)
        remote_object_id: Option<RemoteObjectId>,
        /// Generated temporary password when a directory user was created.
        /// Returned to the caller once; never persisted or logged.
        temp_password: Option<String>,
    },
    /// The remote object was deleted and the linkage cleared; the record
    /// is `unsynced`
    Unlinked,
    /// Transient failure within the retry budget; the record is `pending`
    /// and the caller should re-enqueue with backoff
    RetryBackoff {
        /// Classified error message for logs
        message: String,
    },
    /// Stale linkage was cleared; the record is `pending` and the caller
    /// should re-enqueue immediately as a fresh sync, without counting
    /// this against the retry budget
    RetryNow {
        /// Explanation of the recovery for logs
        message: String,
    },
    /// Terminal failure; the record is `failed` with `last_error` set
    Failed {
        /// Human-actionable error message
        message: String,
    },
}

/// Internal result of the operation branch, before ledger/event routing
enum OpResult {
    Success {
        remote_id: Option<RemoteObjectId>,
        temp_password: Option<String>,
    },
    Unlinked,
    StaleLink {
        message: String,
    },
    LocalValidation(DomainError),
    DirectoryFailure(DirectoryError),
}

// ============================================================================
// ReconcileIdentityUseCase
// ============================================================================

/// Use case executing one reconciliation attempt per invocation
pub struct ReconcileIdentityUseCase {
    directory: Arc<dyn IDirectoryProvider>,
    store: Arc<dyn IIdentityStore>,
    events: Arc<dyn ISyncEventSink>,
    settings: SyncSettings,
}

impl ReconcileIdentityUseCase {
    /// Creates the use case with its port dependencies
    pub fn new(
        directory: Arc<dyn IDirectoryProvider>,
        store: Arc<dyn IIdentityStore>,
        events: Arc<dyn ISyncEventSink>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            directory,
            store,
            events,
            settings,
        }
    }

    /// Executes one attempt for the given record and operation
    ///
    /// `attempt` is the 0-based attempt index used against the configured
    /// retry budget. The caller must hold the per-id execution slot; this
    /// method additionally enforces the status-level transition rules.
    ///
    /// # Errors
    /// Returns an error only when the identity store itself fails; the
    /// record may then be left `in_progress` for the stuck-attempt reaper.
    pub async fn execute(
        &self,
        id: LocalId,
        operation: SyncOperation,
        attempt: u32,
    ) -> Result<AttemptOutcome> {
        // Step 1: Load the record
        let record = match self
            .store
            .get_record(id)
            .await
            .context("Failed to load identity record")?
        {
            Some(record) => record,
            None => {
                warn!(%id, "Sync attempt for unknown identity record");
                return Ok(AttemptOutcome::Failed {
                    message: format!("no identity record with id {id}"),
                });
            }
        };

        // Step 2: Status gate (the orchestrator's in-flight registry is the
        // in-process lock; this guards the persisted state machine)
        if let Err(e) = record.sync_status.transition(SyncStatus::InProgress) {
            warn!(%id, status = %record.sync_status, "Attempt not admissible");
            return Ok(AttemptOutcome::Failed {
                message: e.to_string(),
            });
        }

        // Step 3: Mark the attempt as started, clearing last_error
        self.store
            .mark_in_progress(id)
            .await
            .context("Failed to mark attempt in progress")?;

        debug!(%id, %operation, attempt, "Reconciliation attempt started");

        // Step 4: Run the operation branch
        let op_result = self.run_operation(&record, operation).await?;

        // Step 5: Route the result to ledger, events, and caller
        self.finish(id, operation, attempt, op_result).await
    }

    // ========================================================================
    // Operation branches
    // ========================================================================

    async fn run_operation(
        &self,
        record: &IdentityRecord,
        operation: SyncOperation,
    ) -> Result<OpResult> {
        match operation {
            SyncOperation::Sync => match &record.remote_object_id {
                Some(remote_id) => self.run_update(record, remote_id).await,
                None => self.run_create(record).await,
            },
            SyncOperation::Create => match &record.remote_object_id {
                // The linkage invariant holds even for forced creates: a
                // linked record never issues a second create
                Some(remote_id) => Ok(OpResult::LocalValidation(DomainError::Validation(
                    format!("record is already linked to remote object {remote_id} — use sync or update"),
                ))),
                None => self.run_create(record).await,
            },
            SyncOperation::Update => match &record.remote_object_id {
                Some(remote_id) => self.run_update(record, remote_id).await,
                None => Ok(OpResult::LocalValidation(DomainError::Validation(
                    "record has no remote linkage — run sync or create first".to_string(),
                ))),
            },
            SyncOperation::Disable => self.run_disable(record).await,
            SyncOperation::DeleteLink => self.run_delete_link(record).await,
        }
    }

    /// Creates the directory user; on Conflict, adopts the existing object
    async fn run_create(&self, record: &IdentityRecord) -> Result<OpResult> {
        let password = generate_temp_password(self.settings.temp_password_length);
        let payload = match build_create_payload(record, &password) {
            Ok(payload) => payload,
            Err(e) => return Ok(OpResult::LocalValidation(e)),
        };

        match self.directory.create_user(&payload).await {
            Ok(remote_id) => {
                info!(id = %record.id, %remote_id, "Directory user created");
                Ok(OpResult::Success {
                    remote_id: Some(remote_id),
                    temp_password: Some(password),
                })
            }
            Err(DirectoryError::Conflict(msg)) => self.adopt_existing(record, &msg).await,
            Err(e) => Ok(OpResult::DirectoryFailure(e)),
        }
    }

    /// Conflict reconciliation: look up the existing remote object by email
    /// and adopt its ID instead of failing outright
    async fn adopt_existing(&self, record: &IdentityRecord, conflict_msg: &str) -> Result<OpResult> {
        info!(
            id = %record.id,
            email = %record.email,
            "Create conflicted, adopting existing directory object"
        );

        match self.directory.find_by_email(&record.email).await {
            Ok(Some(existing)) => {
                // Local wins: push the current local fields onto the
                // adopted object
                let payload = match build_update_payload(record) {
                    Ok(payload) => payload,
                    Err(e) => return Ok(OpResult::LocalValidation(e)),
                };
                match self.directory.update_user(&existing, &payload).await {
                    Ok(()) => Ok(OpResult::Success {
                        remote_id: Some(existing),
                        temp_password: None,
                    }),
                    Err(e) => Ok(OpResult::DirectoryFailure(e)),
                }
            }
            Ok(None) => Ok(OpResult::DirectoryFailure(DirectoryError::Unclassified(
                format!(
                    "directory reported a duplicate ({conflict_msg}) but no user matches {}",
                    record.email
                ),
            ))),
            Err(e) => Ok(OpResult::DirectoryFailure(e)),
        }
    }

    /// Updates the linked directory user; 404 clears the stale linkage
    async fn run_update(
        &self,
        record: &IdentityRecord,
        remote_id: &RemoteObjectId,
    ) -> Result<OpResult> {
        let payload = match build_update_payload(record) {
            Ok(payload) => payload,
            Err(e) => return Ok(OpResult::LocalValidation(e)),
        };

        match self.directory.update_user(remote_id, &payload).await {
            Ok(()) => Ok(OpResult::Success {
                remote_id: Some(remote_id.clone()),
                temp_password: None,
            }),
            Err(DirectoryError::NotFound(msg)) => self.recover_stale_link(record, remote_id, &msg).await,
            Err(e) => Ok(OpResult::DirectoryFailure(e)),
        }
    }

    /// Disables the linked directory user; without a linkage the intent is
    /// already satisfied and the attempt is a no-op success
    async fn run_disable(&self, record: &IdentityRecord) -> Result<OpResult> {
        let remote_id = match &record.remote_object_id {
            Some(remote_id) => remote_id,
            None => {
                debug!(id = %record.id, "Disable with no remote linkage, nothing to do");
                return Ok(OpResult::Success {
                    remote_id: None,
                    temp_password: None,
                });
            }
        };

        match self.directory.disable_user(remote_id).await {
            Ok(()) => Ok(OpResult::Success {
                remote_id: Some(remote_id.clone()),
                temp_password: None,
            }),
            Err(DirectoryError::NotFound(msg)) => self.recover_stale_link(record, remote_id, &msg).await,
            Err(e) => Ok(OpResult::DirectoryFailure(e)),
        }
    }

    /// Deletes the remote object and clears the local linkage
    async fn run_delete_link(&self, record: &IdentityRecord) -> Result<OpResult> {
        let remote_id = match &record.remote_object_id {
            Some(remote_id) => remote_id.clone(),
            None => {
                // Nothing to delete remotely; just normalize the status
                self.store
                    .clear_remote_link(record.id, SyncStatus::Unsynced)
                    .await
                    .context("Failed to clear remote link")?;
                return Ok(OpResult::Unlinked);
            }
        };

        match self.directory.delete_user(&remote_id).await {
            // Already gone counts as done
            Ok(()) | Err(DirectoryError::NotFound(_)) => {
                self.store
                    .clear_remote_link(record.id, SyncStatus::Unsynced)
                    .await
                    .context("Failed to clear remote link")?;
                info!(id = %record.id, %remote_id, "Directory user deleted, linkage cleared");
                Ok(OpResult::Unlinked)
            }
            Err(e) => Ok(OpResult::DirectoryFailure(e)),
        }
    }

    /// The remote object vanished out-of-band: clear the linkage and ask
    /// the orchestrator for an immediate fresh sync
    async fn recover_stale_link(
        &self,
        record: &IdentityRecord,
        remote_id: &RemoteObjectId,
        not_found_msg: &str,
    ) -> Result<OpResult> {
        warn!(
            id = %record.id,
            %remote_id,
            "Remote object no longer exists, clearing stale linkage"
        );
        self.store
            .clear_remote_link(record.id, SyncStatus::Pending)
            .await
            .context("Failed to clear stale remote link")?;
        Ok(OpResult::StaleLink {
            message: format!(
                "remote object {remote_id} no longer exists ({not_found_msg}) — linkage cleared, re-queued as create"
            ),
        })
    }

    // ========================================================================
    // Outcome routing
    // ========================================================================

    async fn finish(
        &self,
        id: LocalId,
        operation: SyncOperation,
        attempt: u32,
        op_result: OpResult,
    ) -> Result<AttemptOutcome> {
        match op_result {
            OpResult::Success {
                remote_id,
                temp_password,
            } => {
                self.store
                    .mark_synced(id, remote_id.as_ref(), Utc::now())
                    .await
                    .context("Failed to record successful attempt")?;
                info!(%id, %operation, "Sync attempt succeeded");
                self.events.publish(SyncEvent::success(id, remote_id.clone()));
                Ok(AttemptOutcome::Synced {
                    remote_object_id: remote_id,
                    temp_password,
                })
            }

            OpResult::Unlinked => {
                self.events.publish(SyncEvent::success(id, None));
                Ok(AttemptOutcome::Unlinked)
            }

            OpResult::StaleLink { message } => {
                // Linkage already cleared and status set to pending
                Ok(AttemptOutcome::RetryNow { message })
            }

            OpResult::LocalValidation(e) => {
                // Terminal without any network call; no retry will succeed
                // until the local data is fixed
                self.fail(id, e.to_string()).await
            }

            OpResult::DirectoryFailure(e) if e.is_transient() => {
                if attempt + 1 >= self.settings.max_attempts {
                    self.fail(
                        id,
                        format!("{e} (gave up after {} attempts)", attempt + 1),
                    )
                    .await
                } else {
                    self.store
                        .set_status(id, SyncStatus::Pending)
                        .await
                        .context("Failed to re-queue record")?;
                    debug!(%id, attempt, error = %e, "Transient failure, re-queued");
                    Ok(AttemptOutcome::RetryBackoff {
                        message: e.to_string(),
                    })
                }
            }

            OpResult::DirectoryFailure(e) => self.fail(id, e.to_string()).await,
        }
    }

    async fn fail(&self, id: LocalId, message: String) -> Result<AttemptOutcome> {
        self.store
            .mark_failed(id, &message)
            .await
            .context("Failed to record terminal failure")?;
        warn!(%id, error = %message, "Sync attempt failed terminally");
        self.events.publish(SyncEvent::failure(id, None, message.clone()));
        Ok(AttemptOutcome::Failed { message })
    }
}
