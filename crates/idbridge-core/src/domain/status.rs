//! Sync status state machine
//!
//! Each identity record carries exactly one [`SyncStatus`]. Transitions are
//! checked: an attempt may only start from a state that allows it, and
//! `Disabled` can never reach `InProgress` without an explicit re-enable.
//!
//! ```text
//!  ┌──────────┐ enqueue  ┌─────────┐  attempt   ┌─────────────┐
//!  │ Unsynced │ ───────► │ Pending │ ─────────► │ InProgress  │
//!  └──────────┘          └─────────┘            └─────────────┘
//!        ▲                    ▲                   │        │
//!        │  delete-link       │ transient retry / │        │ terminal
//!        └────────────────────┤ operator reset    ▼        ▼
//!                             │               ┌────────┐ ┌────────┐
//!                             └───────────────│ Synced │ │ Failed │
//!                                             └────────┘ └────────┘
//! ```
//!
//! `Disabled` is reachable from any state by operator action only, and
//! leaves only toward `Pending` (re-enable) or `Unsynced` (unlink).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Per-record synchronization status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No remote linkage exists yet
    #[default]
    Unsynced,
    /// Queued for sync, not yet attempted or awaiting retry
    Pending,
    /// A sync attempt is currently executing
    InProgress,
    /// Last attempt succeeded; remote object ID is believed current
    Synced,
    /// Last attempt failed with a terminal error
    Failed,
    /// Sync intentionally turned off for this record
    Disabled,
}

impl SyncStatus {
    /// Returns true if a new attempt may be started from this status
    pub fn can_start_attempt(&self) -> bool {
        matches!(
            self,
            SyncStatus::Unsynced | SyncStatus::Pending | SyncStatus::Synced | SyncStatus::Failed
        )
    }

    /// Returns true if the record needs operator attention
    pub fn needs_attention(&self) -> bool {
        matches!(self, SyncStatus::Failed)
    }

    /// Checks whether the transition to `to` is legal
    pub fn can_transition(&self, to: SyncStatus) -> bool {
        use SyncStatus::*;
        match to {
            // Attempts start only from admissible states
            InProgress => self.can_start_attempt(),
            // Terminal attempt outcomes only follow an active attempt
            Synced | Failed => matches!(self, InProgress),
            // Operator reset and transient re-enqueue
            Pending => true,
            // Unlinking is always allowed
            Unsynced => true,
            // Operator opt-out is always allowed
            Disabled => true,
        }
    }

    /// Applies the transition, rejecting illegal ones
    ///
    /// # Errors
    /// Returns `DomainError::InvalidTransition` if the move is not allowed
    pub fn transition(self, to: SyncStatus) -> Result<SyncStatus, DomainError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }

    /// Stable string form used by the ledger and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unsynced => "unsynced",
            SyncStatus::Pending => "pending",
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Disabled => "disabled",
        }
    }

    /// Parses the ledger string form
    ///
    /// # Errors
    /// Returns `DomainError::InvalidId` for unknown status strings
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "unsynced" => Ok(SyncStatus::Unsynced),
            "pending" => Ok(SyncStatus::Pending),
            "in_progress" => Ok(SyncStatus::InProgress),
            "synced" => Ok(SyncStatus::Synced),
            "failed" => Ok(SyncStatus::Failed),
            "disabled" => Ok(SyncStatus::Disabled),
            other => Err(DomainError::InvalidId(format!(
                "Unknown sync status: {other}"
            ))),
        }
    }

    /// All statuses, for dashboard count scaffolding
    pub fn all() -> [SyncStatus; 6] {
        [
            SyncStatus::Unsynced,
            SyncStatus::Pending,
            SyncStatus::InProgress,
            SyncStatus::Synced,
            SyncStatus::Failed,
            SyncStatus::Disabled,
        ]
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
