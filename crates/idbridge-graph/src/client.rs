//! Directory API client
//!
//! Typed HTTP client for the Graph-style user directory. Handles bearer
//! authentication, rate limiting, a single token-refresh retry on auth
//! rejections, and the classification of every failure into the
//! [`DirectoryError`] taxonomy that the reconciliation logic branches on.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use idbridge_core::config::DirectorySettings;
use idbridge_core::domain::{DirectoryError, Email, RemoteObjectId};
use idbridge_core::mapper::DirectoryUserPayload;
use idbridge_core::ports::{AccessToken, IDirectoryProvider, ITokenProvider};

use crate::rate_limit::RequestLimiter;

// ============================================================================
// Wire types
// ============================================================================

/// Directory object as returned on create and lookup
#[derive(Debug, Deserialize)]
struct DirectoryObject {
    /// Server-assigned object ID
    id: String,
}

/// Collection wrapper for list responses
#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    value: Vec<Value>,
}

/// Error body shape: `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Default, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    error: GraphErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct GraphErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// ============================================================================
// GraphDirectoryProvider
// ============================================================================

/// Directory adapter backed by a Graph-style HTTP API
///
/// Every request:
/// 1. takes a permit from the shared [`RequestLimiter`],
/// 2. attaches a bearer token from the injected token provider,
/// 3. on 401/403, invalidates the token and re-attempts exactly once,
/// 4. maps any failure to one [`DirectoryError`] class.
pub struct GraphDirectoryProvider {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn ITokenProvider>,
    limiter: Arc<RequestLimiter>,
}

impl GraphDirectoryProvider {
    /// Creates a provider from the directory settings and token provider
    ///
    /// The per-call timeout and rate limits come from the settings; the
    /// limiter is shared by clones of the internal HTTP client.
    pub fn new(
        settings: &DirectorySettings,
        tokens: Arc<dyn ITokenProvider>,
    ) -> Result<Self, DirectoryError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| {
                DirectoryError::Unclassified(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            tokens,
            limiter: Arc::new(RequestLimiter::new(
                settings.rate_limit_burst,
                settings.rate_limit_per_sec,
            )),
        })
    }

    /// Returns the shared request limiter
    pub fn limiter(&self) -> &Arc<RequestLimiter> {
        &self.limiter
    }

    /// Creates an authenticated request builder for the given method and
    /// path relative to the base URL
    fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, url).bearer_auth(token.secret())
    }

    async fn build_and_send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
        token: &AccessToken,
    ) -> Result<Response, DirectoryError> {
        let mut request = self.request(method, path, token);
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(classify_transport_error)
    }

    /// Sends a request with rate limiting and the single auth retry
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Response, DirectoryError> {
        self.limiter.acquire().await;

        let token = self.tokens.get_token().await?;
        let response = self
            .build_and_send(method.clone(), path, query, body, &token)
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            // One token refresh and immediate re-attempt; a second
            // rejection is terminal for this attempt
            debug!(path, status = %response.status(), "Auth rejected, refreshing token once");
            self.tokens.invalidate().await;
            let token = self.tokens.get_token().await?;
            return self.build_and_send(method, path, query, body, &token).await;
        }

        Ok(response)
    }

    /// Sends a request and classifies any non-success status
    async fn send_checked(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Response, DirectoryError> {
        let is_create = method == Method::POST;
        let response = self.send(method, path, query, body).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();
        let error = classify_response(status, &error_body, is_create);
        warn!(path, status = %status, class = error.class(), "Directory request failed");
        Err(error)
    }

    fn to_value<T: serde::Serialize>(payload: &T) -> Result<Value, DirectoryError> {
        serde_json::to_value(payload)
            .map_err(|e| DirectoryError::Unclassified(format!("Failed to encode payload: {e}")))
    }
}

#[async_trait::async_trait]
impl IDirectoryProvider for GraphDirectoryProvider {
    async fn create_user(
        &self,
        payload: &DirectoryUserPayload,
    ) -> Result<RemoteObjectId, DirectoryError> {
        debug!("Creating directory user");
        let body = Self::to_value(payload)?;

        let response = self
            .send_checked(Method::POST, "/users", None, Some(&body))
            .await?;

        let created: DirectoryObject = response.json().await.map_err(|e| {
            DirectoryError::Unclassified(format!("Failed to parse create response: {e}"))
        })?;

        RemoteObjectId::new(created.id).map_err(|e| {
            DirectoryError::Unclassified(format!("Directory returned an invalid object ID: {e}"))
        })
    }

    async fn update_user(
        &self,
        remote_id: &RemoteObjectId,
        payload: &DirectoryUserPayload,
    ) -> Result<(), DirectoryError> {
        debug!(%remote_id, "Updating directory user");
        let body = Self::to_value(payload)?;
        let path = format!("/users/{remote_id}");

        self.send_checked(Method::PATCH, &path, None, Some(&body))
            .await?;
        Ok(())
    }

    async fn disable_user(&self, remote_id: &RemoteObjectId) -> Result<(), DirectoryError> {
        debug!(%remote_id, "Disabling directory user");
        let body = json!({ "accountEnabled": false });
        let path = format!("/users/{remote_id}");

        self.send_checked(Method::PATCH, &path, None, Some(&body))
            .await?;
        Ok(())
    }

    async fn delete_user(&self, remote_id: &RemoteObjectId) -> Result<(), DirectoryError> {
        debug!(%remote_id, "Deleting directory user");
        let path = format!("/users/{remote_id}");

        self.send_checked(Method::DELETE, &path, None, None).await?;
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<RemoteObjectId>, DirectoryError> {
        debug!(%email, "Looking up directory user by principal name");
        let query = [
            (
                "$filter",
                format!("userPrincipalName eq '{}'", email.as_str()),
            ),
            ("$select", "id".to_string()),
        ];

        let response = self
            .send_checked(Method::GET, "/users", Some(&query[..]), None)
            .await?;

        let collection: CollectionResponse = response.json().await.map_err(|e| {
            DirectoryError::Unclassified(format!("Failed to parse lookup response: {e}"))
        })?;

        // An empty result set is a clean "not found", not an error
        let Some(first) = collection.value.first() else {
            return Ok(None);
        };

        let object: DirectoryObject = serde_json::from_value(first.clone()).map_err(|e| {
            DirectoryError::Unclassified(format!("Failed to parse lookup entry: {e}"))
        })?;

        RemoteObjectId::new(object.id)
            .map(Some)
            .map_err(|e| {
                DirectoryError::Unclassified(format!(
                    "Directory returned an invalid object ID: {e}"
                ))
            })
    }

    async fn test_connection(&self) -> Result<String, DirectoryError> {
        let response = self
            .send_checked(Method::GET, "/organization", None, None)
            .await?;

        let collection: CollectionResponse = response.json().await.map_err(|e| {
            DirectoryError::Unclassified(format!("Failed to parse organization response: {e}"))
        })?;

        let name = collection
            .value
            .first()
            .and_then(|org| org.get("displayName"))
            .and_then(Value::as_str)
            .unwrap_or("unnamed tenant");

        Ok(format!("connected to organization '{name}'"))
    }
}

// ============================================================================
// Error classification
// ============================================================================

/// Maps transport-level failures (no HTTP status available)
fn classify_transport_error(error: reqwest::Error) -> DirectoryError {
    if error.is_timeout() || error.is_connect() {
        DirectoryError::Transient(format!("network error: {error}"))
    } else {
        DirectoryError::Unclassified(format!("request error: {error}"))
    }
}

/// Maps an HTTP failure status plus error body to exactly one error class
///
/// `is_create` widens conflict detection to duplicate-object error codes
/// that some directories report as 400 rather than 409.
fn classify_response(status: StatusCode, body: &str, is_create: bool) -> DirectoryError {
    let detail: GraphErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = detail.error.code;
    let message = if detail.error.message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("{} ({})", detail.error.message, status)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => DirectoryError::Transient(message),

        StatusCode::CONFLICT => DirectoryError::Conflict(message),

        StatusCode::BAD_REQUEST => {
            if is_create && is_duplicate_code(&code, &message) {
                DirectoryError::Conflict(message)
            } else {
                DirectoryError::Validation(message)
            }
        }

        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::Auth(message),

        StatusCode::NOT_FOUND => DirectoryError::NotFound(message),

        _ => DirectoryError::Unclassified(message),
    }
}

/// Duplicate-object signals seen in Graph-style error bodies
fn is_duplicate_code(code: &str, message: &str) -> bool {
    code.eq_ignore_ascii_case("ObjectConflict")
        || message.contains("already exists")
        || message.contains("proposed userPrincipalName")
}
