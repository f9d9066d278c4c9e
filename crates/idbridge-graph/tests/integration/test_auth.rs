//! Integration tests for token acquisition and the auth-retry path
//!
//! Runs the client-credential provider against a mock token endpoint and
//! verifies caching, proactive refresh, credential failures, and the
//! directory client's single refresh-and-retry on 401.

use std::sync::Arc;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use idbridge_core::domain::{DirectoryError, Email};
use idbridge_core::ports::{IDirectoryProvider, ITokenProvider};
use idbridge_graph::{ClientCredentialTokenProvider, GraphDirectoryProvider};

use crate::common;

const TOKEN_PATH: &str = "/test-tenant/oauth2/v2.0/token";

async fn mount_token_endpoint(server: &MockServer, access_token: &str, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_token_is_cached_across_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-1",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = ClientCredentialTokenProvider::new(&common::settings_for(&server)).unwrap();

    let first = provider.get_token().await.expect("first acquisition");
    let second = provider.get_token().await.expect("cached acquisition");

    assert_eq!(first.secret(), "tok-1");
    assert_eq!(second.secret(), "tok-1");
}

#[tokio::test]
async fn test_token_within_skew_is_refreshed() {
    let server = MockServer::start().await;

    // 30s lifetime is inside the 60s expiry skew, so every call refreshes
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-short",
            "token_type": "Bearer",
            "expires_in": 30
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = ClientCredentialTokenProvider::new(&common::settings_for(&server)).unwrap();
    provider.get_token().await.expect("first acquisition");
    provider.get_token().await.expect("refresh acquisition");
}

#[tokio::test]
async fn test_invalid_credentials_surface_as_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "AADSTS7000215: Invalid client secret provided."
        })))
        .mount(&server)
        .await;

    let provider = ClientCredentialTokenProvider::new(&common::settings_for(&server)).unwrap();
    let error = provider.get_token().await.unwrap_err();
    assert!(matches!(error, DirectoryError::Auth(_)));
}

#[tokio::test]
async fn test_invalidate_forces_reacquisition() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 3600).await;

    let provider = ClientCredentialTokenProvider::new(&common::settings_for(&server)).unwrap();
    provider.get_token().await.expect("first acquisition");
    provider.invalidate().await;
    provider.get_token().await.expect("reacquisition");

    let requests = server.received_requests().await.unwrap();
    let token_calls = requests.iter().filter(|r| r.url.path() == TOKEN_PATH).count();
    assert_eq!(token_calls, 2);
}

#[tokio::test]
async fn test_401_triggers_one_refresh_and_retry() {
    let server = MockServer::start().await;

    // First exchange hands out a stale token, the second a good one
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-stale",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "tok-fresh",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    // The stale token is rejected, the fresh one accepted
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("authorization", "Bearer tok-stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": "InvalidAuthenticationToken", "message": "Access token has expired." }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .and(header("authorization", "Bearer tok-fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "obj-7" }]
        })))
        .mount(&server)
        .await;

    let settings = common::settings_for(&server);
    let tokens = Arc::new(ClientCredentialTokenProvider::new(&settings).unwrap());
    let provider = GraphDirectoryProvider::new(&settings, tokens).unwrap();

    let email = Email::new("jane@example.com".to_string()).unwrap();
    let found = provider
        .find_by_email(&email)
        .await
        .expect("lookup should succeed after token refresh");
    assert_eq!(found.unwrap().as_str(), "obj-7");
}

#[tokio::test]
async fn test_persistent_401_is_terminal_auth_failure() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "tok-1", 3600).await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": "InvalidAuthenticationToken", "message": "still rejected" }
        })))
        .mount(&server)
        .await;

    let settings = common::settings_for(&server);
    let tokens = Arc::new(ClientCredentialTokenProvider::new(&settings).unwrap());
    let provider = GraphDirectoryProvider::new(&settings, tokens).unwrap();

    let email = Email::new("jane@example.com".to_string()).unwrap();
    let error = provider.find_by_email(&email).await.unwrap_err();
    assert!(matches!(error, DirectoryError::Auth(_)));

    // Exactly one retry: two requests to /users in total
    let requests = server.received_requests().await.unwrap();
    let user_calls = requests.iter().filter(|r| r.url.path() == "/users").count();
    assert_eq!(user_calls, 2);
}
