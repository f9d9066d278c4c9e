//! Directory provider port (driven/secondary port)
//!
//! Interface to the external user directory. The primary implementation
//! targets a Microsoft-Graph-style API, but the trait is provider-agnostic.
//!
//! ## Design Notes
//!
//! - Unlike storage ports, this port returns the typed [`DirectoryError`]
//!   taxonomy: the reconciliation logic branches on the error class
//!   (retry, adopt, recover, fail), so classification must survive the
//!   port boundary.
//! - Implementations own rate limiting, per-call timeouts, and the single
//!   token-refresh retry on auth failures; callers see the final class.

use crate::domain::{DirectoryError, Email, RemoteObjectId};
use crate::mapper::DirectoryUserPayload;

/// Port trait for user-directory operations
#[async_trait::async_trait]
pub trait IDirectoryProvider: Send + Sync {
    /// Creates a directory user
    ///
    /// # Returns
    /// The server-assigned object ID of the new user
    async fn create_user(
        &self,
        payload: &DirectoryUserPayload,
    ) -> Result<RemoteObjectId, DirectoryError>;

    /// Updates an existing directory user
    async fn update_user(
        &self,
        remote_id: &RemoteObjectId,
        payload: &DirectoryUserPayload,
    ) -> Result<(), DirectoryError>;

    /// Disables an existing directory user (accountEnabled = false)
    async fn disable_user(&self, remote_id: &RemoteObjectId) -> Result<(), DirectoryError>;

    /// Deletes a directory user
    async fn delete_user(&self, remote_id: &RemoteObjectId) -> Result<(), DirectoryError>;

    /// Looks up a directory user by principal name
    ///
    /// # Returns
    /// `Ok(None)` when no user matches; an empty result is not an error
    async fn find_by_email(&self, email: &Email)
        -> Result<Option<RemoteObjectId>, DirectoryError>;

    /// Probes connectivity and credentials
    ///
    /// # Returns
    /// A human-readable detail string (e.g. the tenant organization name)
    async fn test_connection(&self) -> Result<String, DirectoryError>;
}
