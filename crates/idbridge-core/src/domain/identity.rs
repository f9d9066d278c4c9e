//! IdentityRecord domain entity
//!
//! The local view of a user as consumed by the sync engine: the identity
//! fields owned by the user store plus the engine-owned linkage and status
//! fields. The user store remains the source of truth for the identity
//! fields; the engine only ever writes the linkage/status fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Email, LocalId, RemoteObjectId};
use super::status::SyncStatus;

/// A local identity record with its directory linkage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Stable local ID (user-store row)
    pub id: LocalId,
    /// Email address, doubling as the directory userPrincipalName
    pub email: Email,
    /// Given name
    pub first_name: String,
    /// Surname
    pub last_name: String,
    /// Job title shown in the directory (1-128 chars when present)
    pub job_title: Option<String>,
    /// Department name
    pub department: Option<String>,
    /// Whether the local account is active
    pub active: bool,
    /// Directory object ID; None until the first successful create
    pub remote_object_id: Option<RemoteObjectId>,
    /// Whether automatic sync is enabled for this record
    pub sync_enabled: bool,
    /// Current sync status
    pub sync_status: SyncStatus,
    /// Last terminal error message, cleared when an attempt starts
    pub last_error: Option<String>,
    /// Timestamp of the last successful sync
    pub last_sync: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    /// Creates a record with the given identity fields and default
    /// engine-owned fields (unsynced, sync enabled, no linkage)
    pub fn new(id: LocalId, email: Email, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id,
            email,
            first_name: first_name.into(),
            last_name: last_name.into(),
            job_title: None,
            department: None,
            active: true,
            remote_object_id: None,
            sync_enabled: true,
            sync_status: SyncStatus::Unsynced,
            last_error: None,
            last_sync: None,
        }
    }

    /// Sets the job title
    pub fn with_job_title(mut self, job_title: impl Into<String>) -> Self {
        self.job_title = Some(job_title.into());
        self
    }

    /// Sets the department
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Full display name as shown in the directory
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Returns true if the record is linked to a remote directory object
    pub fn is_linked(&self) -> bool {
        self.remote_object_id.is_some()
    }
}
