//! Domain and directory error types
//!
//! `DomainError` covers local validation and state-transition failures.
//! `DirectoryError` is the classification every directory API failure is
//! bucketed into; the reconciliation logic branches on the class, never on
//! raw HTTP details.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Invalid remote object ID format
    #[error("Invalid remote object ID: {0}")]
    InvalidRemoteObjectId(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Invalid sync status transition attempt
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status
        from: String,
        /// The attempted target status
        to: String,
    },

    /// Payload validation failure; the message names the offending field
    /// and the accepted bounds so the operator can fix the record
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Classified directory API failure
///
/// Every response from the remote directory maps to exactly one variant:
///
/// | Variant        | Typical cause                    | Handling            |
/// |----------------|----------------------------------|---------------------|
/// | `Transient`    | timeout, 429, 502/503/504        | retry with backoff  |
/// | `Conflict`     | 409, duplicate userPrincipalName | adopt existing id   |
/// | `Validation`   | 400 schema/field rejection       | terminal            |
/// | `Auth`         | 401/403 after one token refresh  | terminal            |
/// | `NotFound`     | 404 on update/disable/delete     | stale link recovery |
/// | `Unclassified` | anything else                    | terminal            |
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Failure expected to resolve itself on retry
    #[error("Transient directory error: {0}")]
    Transient(String),

    /// A remote object already exists for this identity
    #[error("Remote object conflict: {0}")]
    Conflict(String),

    /// The directory rejected the payload; requires a local data fix
    #[error("Directory rejected payload: {0}")]
    Validation(String),

    /// Credential-level failure (invalid secret, missing permission)
    #[error("Directory authentication failed: {0}")]
    Auth(String),

    /// The remote object no longer exists (deleted out-of-band)
    #[error("Remote object not found: {0}")]
    NotFound(String),

    /// Unmatched failure, treated conservatively as terminal
    #[error("Unclassified directory error: {0}")]
    Unclassified(String),
}

impl DirectoryError {
    /// Returns true if the error is eligible for retry with backoff
    pub fn is_transient(&self) -> bool {
        matches!(self, DirectoryError::Transient(_))
    }

    /// Short classification label for logs and the status ledger
    pub fn class(&self) -> &'static str {
        match self {
            DirectoryError::Transient(_) => "transient",
            DirectoryError::Conflict(_) => "conflict",
            DirectoryError::Validation(_) => "validation",
            DirectoryError::Auth(_) => "auth",
            DirectoryError::NotFound(_) => "not_found",
            DirectoryError::Unclassified(_) => "unclassified",
        }
    }
}
