//! Shared test helpers for directory adapter integration tests
//!
//! Provides wiremock-based mock server setup for the Graph-style user
//! endpoints. Each helper mounts the necessary mock endpoints and returns
//! a configured provider pointing at the mock server.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use idbridge_core::config::DirectorySettings;
use idbridge_core::domain::{Email, IdentityRecord, LocalId};
use idbridge_core::mapper::DirectoryUserPayload;
use idbridge_graph::{GraphDirectoryProvider, StaticTokenProvider};

/// Directory settings pointing at the given mock server
pub fn settings_for(server: &MockServer) -> DirectorySettings {
    DirectorySettings {
        tenant_id: "test-tenant".to_string(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        authority: server.uri(),
        base_url: server.uri(),
        request_timeout_secs: 5,
        // Generous limits so tests never wait on the bucket
        rate_limit_burst: 1000,
        rate_limit_per_sec: 1000.0,
        ..DirectorySettings::default()
    }
}

/// Starts a mock server and returns it with a provider using a fixed token
pub async fn setup_directory_mock() -> (MockServer, GraphDirectoryProvider) {
    let server = MockServer::start().await;
    let provider = GraphDirectoryProvider::new(
        &settings_for(&server),
        Arc::new(StaticTokenProvider::new("test-access-token")),
    )
    .expect("provider construction");
    (server, provider)
}

/// A create payload for the standard test record
pub fn create_payload() -> DirectoryUserPayload {
    let record = test_record();
    idbridge_core::mapper::build_create_payload(&record, "Temp0rary!pw").unwrap()
}

/// An update payload for the standard test record
pub fn update_payload() -> DirectoryUserPayload {
    idbridge_core::mapper::build_update_payload(&test_record()).unwrap()
}

fn test_record() -> IdentityRecord {
    IdentityRecord::new(
        LocalId::new(7),
        Email::new("jane@example.com".to_string()).unwrap(),
        "Jane",
        "Doe",
    )
    .with_job_title("Engineer")
}

/// Mounts a successful user-creation endpoint returning the given object ID
pub async fn mount_create_success(server: &MockServer, object_id: &str) {
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": object_id,
            "userPrincipalName": "jane@example.com",
            "displayName": "Jane Doe"
        })))
        .mount(server)
        .await;
}

/// Mounts a Graph-style error response on the given method/path
pub async fn mount_error(
    server: &MockServer,
    http_method: &str,
    endpoint: &str,
    status: u16,
    code: &str,
    message: &str,
) {
    Mock::given(method(http_method))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": { "code": code, "message": message }
        })))
        .mount(server)
        .await;
}
