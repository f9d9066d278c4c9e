//! Typed sync tasks and submission manifests
//!
//! Each queue entry carries its own typed payload; the worker dispatches on
//! the operation variant directly, with no runtime string matching.

use std::fmt;

use serde::{Deserialize, Serialize};

use idbridge_core::domain::{LocalId, SyncOperation};

/// A unit of work on the sync queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTask {
    /// Record to reconcile
    pub local_id: LocalId,
    /// Requested operation
    pub operation: SyncOperation,
    /// Whether the submission bypassed the per-record sync-enabled gate
    pub force: bool,
    /// 0-based attempt index against the retry budget
    pub attempt: u32,
}

impl SyncTask {
    /// Creates a first-attempt task
    pub fn new(local_id: LocalId, operation: SyncOperation, force: bool) -> Self {
        Self {
            local_id,
            operation,
            force,
            attempt: 0,
        }
    }
}

/// Why a submission was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Sync is disabled for the record and force was not set
    SyncDisabled,
    /// An attempt for this record is currently executing
    AlreadyInProgress,
    /// A task for this record is already queued; the submission coalesces
    AlreadyQueued,
    /// No identity record exists for the ID
    UnknownRecord,
    /// The sync queue is at capacity
    QueueFull,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::SyncDisabled => "sync disabled",
            RejectReason::AlreadyInProgress => "already in progress",
            RejectReason::AlreadyQueued => "already queued",
            RejectReason::UnknownRecord => "unknown record",
            RejectReason::QueueFull => "queue full",
        };
        write!(f, "{s}")
    }
}

/// Per-ID acceptance report returned at submission time
///
/// Acceptance means "admitted to the queue", not a final outcome; outcomes
/// land in the status ledger as each task completes. One rejected ID never
/// fails the bulk as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionManifest {
    /// IDs admitted to the queue
    pub accepted: Vec<LocalId>,
    /// IDs rejected at submission, with the reason
    pub rejected: Vec<(LocalId, RejectReason)>,
}

impl SubmissionManifest {
    /// Records an acceptance
    pub fn accept(&mut self, id: LocalId) {
        self.accepted.push(id);
    }

    /// Records a rejection
    pub fn reject(&mut self, id: LocalId, reason: RejectReason) {
        self.rejected.push((id, reason));
    }
}
