//! Sync operation variants
//!
//! The closed set of operations the engine accepts. `Sync` is the general
//! create-or-update; `Create` and `Update` force one side of that branch;
//! `Disable` turns the remote account off; `DeleteLink` removes the remote
//! object and clears the local linkage.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Requested sync operation for an identity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Intelligent create-or-update based on the stored remote linkage
    Sync,
    /// Forced create (skips the remote-id branch check)
    Create,
    /// Forced update (requires an existing remote linkage)
    Update,
    /// Disable the remote account (accountEnabled = false)
    Disable,
    /// Delete the remote object and clear the local linkage
    DeleteLink,
}

impl SyncOperation {
    /// Stable string form used in logs and task payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Sync => "sync",
            SyncOperation::Create => "create",
            SyncOperation::Update => "update",
            SyncOperation::Disable => "disable",
            SyncOperation::DeleteLink => "delete_link",
        }
    }

    /// Parses the string form
    ///
    /// # Errors
    /// Returns `DomainError::InvalidId` for unknown operation names
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "sync" => Ok(SyncOperation::Sync),
            "create" => Ok(SyncOperation::Create),
            "update" => Ok(SyncOperation::Update),
            "disable" => Ok(SyncOperation::Disable),
            "delete_link" => Ok(SyncOperation::DeleteLink),
            other => Err(DomainError::InvalidId(format!(
                "Unknown sync operation: {other}"
            ))),
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
