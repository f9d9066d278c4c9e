//! Client-credential authentication for the directory API
//!
//! Implements the OAuth2 client-credentials grant against the Microsoft
//! identity platform for daemon-style (non-interactive) access.
//!
//! ## Components
//!
//! - [`ClientCredentialTokenProvider`] - cached bearer-token provider
//! - [`StaticTokenProvider`] - fixed-token provider for tests and tooling
//!
//! The provider holds a single cached token behind an async mutex. The
//! mutex stays held for the duration of a refresh, so concurrent callers
//! await the in-flight refresh instead of racing their own exchanges.

use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, ClientId, ClientSecret, EndpointNotSet, EndpointSet, Scope, TokenResponse,
    TokenUrl,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use idbridge_core::config::DirectorySettings;
use idbridge_core::domain::DirectoryError;
use idbridge_core::ports::{AccessToken, ITokenProvider};

/// Tokens are treated as expired this many seconds before their actual
/// expiry, absorbing clock skew and in-flight request latency
const EXPIRY_SKEW_SECS: i64 = 60;

// ============================================================================
// ClientCredentialTokenProvider
// ============================================================================

/// Bearer-token provider using the OAuth2 client-credentials grant
///
/// Acquires tokens from the identity platform's token endpoint and caches
/// the current one until it is within [`EXPIRY_SKEW_SECS`] of expiry.
/// Credential-level failures (invalid secret, revoked application) surface
/// immediately as [`DirectoryError::Auth`] without internal retries.
pub struct ClientCredentialTokenProvider {
    oauth: BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    http: reqwest::Client,
    scope: String,
    cached: Mutex<Option<AccessToken>>,
}

impl ClientCredentialTokenProvider {
    /// Creates a provider from the directory settings
    ///
    /// # Errors
    /// Returns `DirectoryError::Auth` if the credential triple is missing
    /// or the derived token URL is invalid
    pub fn new(settings: &DirectorySettings) -> Result<Self, DirectoryError> {
        if !settings.is_configured() {
            return Err(DirectoryError::Auth(
                "directory credentials are not configured".to_string(),
            ));
        }

        let token_url = TokenUrl::new(settings.token_url())
            .map_err(|e| DirectoryError::Auth(format!("Invalid token URL: {e}")))?;

        let oauth = BasicClient::new(ClientId::new(settings.client_id.clone()))
            .set_client_secret(ClientSecret::new(settings.client_secret.clone()))
            .set_token_uri(token_url);

        Ok(Self {
            oauth,
            http: reqwest::Client::new(),
            scope: settings.scope.clone(),
            cached: Mutex::new(None),
        })
    }

    /// Performs the client-credentials exchange
    async fn fetch_token(&self) -> Result<AccessToken, DirectoryError> {
        info!("Acquiring directory access token");

        let token_result = self
            .oauth
            .exchange_client_credentials()
            .add_scope(Scope::new(self.scope.clone()))
            .request_async(&self.http)
            .await
            .map_err(|e| DirectoryError::Auth(format!("Token request failed: {e}")))?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        debug!(%expires_at, "Acquired directory access token");
        Ok(AccessToken::new(
            token_result.access_token().secret().to_string(),
            expires_at,
        ))
    }
}

#[async_trait::async_trait]
impl ITokenProvider for ClientCredentialTokenProvider {
    async fn get_token(&self) -> Result<AccessToken, DirectoryError> {
        // The lock is held across the refresh: a second caller arriving
        // mid-refresh awaits it and reuses the fresh token
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.expires_within(Duration::seconds(EXPIRY_SKEW_SECS)) {
                return Ok(token.clone());
            }
            debug!("Cached token within expiry skew, refreshing");
        }

        let token = self.fetch_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    async fn invalidate(&self) {
        debug!("Invalidating cached directory token");
        *self.cached.lock().await = None;
    }
}

// ============================================================================
// StaticTokenProvider
// ============================================================================

/// Token provider returning a fixed secret, for tests and local tooling
pub struct StaticTokenProvider {
    secret: String,
}

impl StaticTokenProvider {
    /// Creates a provider that always returns the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait::async_trait]
impl ITokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<AccessToken, DirectoryError> {
        Ok(AccessToken::new(
            self.secret.clone(),
            Utc::now() + Duration::hours(24),
        ))
    }

    async fn invalidate(&self) {}
}
