//! Token provider port (driven/secondary port)
//!
//! Supplies short-lived bearer tokens for the directory API. Implementations
//! cache a single token and serialize refreshes so that concurrent callers
//! await one in-flight refresh instead of racing their own.

use chrono::{DateTime, Utc};

use crate::domain::DirectoryError;

/// Bearer token for directory API requests
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: String,
    /// When the token expires (server-reported, without skew allowance)
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token from its secret and expiry
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// The bearer secret for the Authorization header
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns true if the token expires within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for bearer-token acquisition
#[async_trait::async_trait]
pub trait ITokenProvider: Send + Sync {
    /// Returns a valid token, refreshing the cached one if needed
    ///
    /// Credential-level failures surface immediately as
    /// [`DirectoryError::Auth`]; the provider never retries internally, so
    /// a structurally broken credential does not burn the caller's retry
    /// budget.
    async fn get_token(&self) -> Result<AccessToken, DirectoryError>;

    /// Drops the cached token, forcing re-acquisition on the next call
    ///
    /// Used by the directory client's single retry after a 401.
    async fn invalidate(&self);
}
