//! Sync event sink port (driven/secondary port)
//!
//! Structured events emitted on every terminal sync transition, consumed
//! asynchronously by the alerting collaborator. Publishing is fire-and-
//! forget: a full or disconnected sink must never block or fail the sync
//! operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LocalId, RemoteObjectId};

/// Kind of terminal sync transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEventKind {
    /// The attempt ended in `synced`
    SyncSuccess,
    /// The attempt ended in `failed`
    SyncFailure,
}

/// A terminal sync transition event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    /// Event kind
    pub event_type: SyncEventKind,
    /// Local ID of the record
    pub local_id: LocalId,
    /// Remote linkage at the time of the event, if any
    pub remote_id: Option<RemoteObjectId>,
    /// Terminal error message for failures
    pub error: Option<String>,
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
}

impl SyncEvent {
    /// Builds a success event
    pub fn success(local_id: LocalId, remote_id: Option<RemoteObjectId>) -> Self {
        Self {
            event_type: SyncEventKind::SyncSuccess,
            local_id,
            remote_id,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Builds a failure event
    pub fn failure(
        local_id: LocalId,
        remote_id: Option<RemoteObjectId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            event_type: SyncEventKind::SyncFailure,
            local_id,
            remote_id,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Port trait for the alerting collaborator
///
/// `publish` is synchronous and infallible by contract; implementations
/// buffer internally and drop (with a log line) rather than block.
pub trait ISyncEventSink: Send + Sync {
    /// Hands an event to the sink without waiting for delivery
    fn publish(&self, event: SyncEvent);
}
