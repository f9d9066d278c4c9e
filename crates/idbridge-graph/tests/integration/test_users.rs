//! Integration tests for directory user operations
//!
//! Verifies wire behavior and error classification of create, update,
//! disable, delete, and lookup against a mock directory API.

use idbridge_core::domain::{DirectoryError, Email, RemoteObjectId};
use idbridge_core::ports::IDirectoryProvider;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn remote(id: &str) -> RemoteObjectId {
    RemoteObjectId::new(id.to_string()).unwrap()
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_user_returns_object_id() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_create_success(&server, "obj-123").await;

    let id = provider
        .create_user(&common::create_payload())
        .await
        .expect("create failed");

    assert_eq!(id.as_str(), "obj-123");
}

#[tokio::test]
async fn test_create_user_sends_camel_case_payload() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(body_partial_json(serde_json::json!({
            "accountEnabled": true,
            "displayName": "Jane Doe",
            "userPrincipalName": "jane@example.com",
            "mailNickname": "jane",
            "jobTitle": "Engineer",
            "passwordProfile": { "forceChangePasswordNextSignIn": true }
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "obj-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    provider
        .create_user(&common::create_payload())
        .await
        .expect("create failed");
}

#[tokio::test]
async fn test_create_conflict_is_classified() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(
        &server,
        "POST",
        "/users",
        409,
        "Conflict",
        "Another object with the same value for property userPrincipalName already exists.",
    )
    .await;

    let error = provider
        .create_user(&common::create_payload())
        .await
        .unwrap_err();
    assert!(matches!(error, DirectoryError::Conflict(_)));
}

#[tokio::test]
async fn test_create_duplicate_reported_as_400_is_conflict() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(
        &server,
        "POST",
        "/users",
        400,
        "ObjectConflict",
        "Another object with the same value for property userPrincipalName already exists.",
    )
    .await;

    let error = provider
        .create_user(&common::create_payload())
        .await
        .unwrap_err();
    assert!(matches!(error, DirectoryError::Conflict(_)));
}

#[tokio::test]
async fn test_create_schema_rejection_is_validation() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(
        &server,
        "POST",
        "/users",
        400,
        "Request_BadRequest",
        "Invalid value specified for property 'jobTitle'.",
    )
    .await;

    let error = provider
        .create_user(&common::create_payload())
        .await
        .unwrap_err();
    match error {
        DirectoryError::Validation(msg) => assert!(msg.contains("jobTitle")),
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_throttled_is_transient() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(&server, "POST", "/users", 429, "TooManyRequests", "throttled").await;

    let error = provider
        .create_user(&common::create_payload())
        .await
        .unwrap_err();
    assert!(error.is_transient());
}

#[tokio::test]
async fn test_create_bad_gateway_is_transient() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(&server, "POST", "/users", 502, "BadGateway", "upstream error").await;

    let error = provider
        .create_user(&common::create_payload())
        .await
        .unwrap_err();
    assert!(error.is_transient());
}

// ============================================================================
// Update / disable / delete
// ============================================================================

#[tokio::test]
async fn test_update_user_patches_object() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/users/obj-9"))
        .and(body_partial_json(serde_json::json!({
            "displayName": "Jane Doe"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .update_user(&remote("obj-9"), &common::update_payload())
        .await
        .expect("update failed");
}

#[tokio::test]
async fn test_update_missing_object_is_not_found() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(
        &server,
        "PATCH",
        "/users/obj-gone",
        404,
        "Request_ResourceNotFound",
        "Resource 'obj-gone' does not exist.",
    )
    .await;

    let error = provider
        .update_user(&remote("obj-gone"), &common::update_payload())
        .await
        .unwrap_err();
    assert!(matches!(error, DirectoryError::NotFound(_)));
}

#[tokio::test]
async fn test_disable_user_sends_account_enabled_false() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("PATCH"))
        .and(path("/users/obj-9"))
        .and(body_partial_json(serde_json::json!({
            "accountEnabled": false
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .disable_user(&remote("obj-9"))
        .await
        .expect("disable failed");
}

#[tokio::test]
async fn test_delete_user() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/users/obj-9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    provider
        .delete_user(&remote("obj-9"))
        .await
        .expect("delete failed");
}

// ============================================================================
// Lookup
// ============================================================================

#[tokio::test]
async fn test_find_by_email_returns_match() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param(
            "$filter",
            "userPrincipalName eq 'jane@example.com'",
        ))
        .and(query_param("$select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "obj-42" }]
        })))
        .mount(&server)
        .await;

    let email = Email::new("jane@example.com".to_string()).unwrap();
    let found = provider.find_by_email(&email).await.expect("lookup failed");
    assert_eq!(found, Some(remote("obj-42")));
}

#[tokio::test]
async fn test_find_by_email_empty_result_is_none() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": []
        })))
        .mount(&server)
        .await;

    let email = Email::new("nobody@example.com".to_string()).unwrap();
    let found = provider.find_by_email(&email).await.expect("lookup failed");
    assert!(found.is_none());
}

// ============================================================================
// Connection test
// ============================================================================

#[tokio::test]
async fn test_connection_reports_organization() {
    let (server, provider) = common::setup_directory_mock().await;

    Mock::given(method("GET"))
        .and(path("/organization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [{ "id": "org-1", "displayName": "Contoso" }]
        })))
        .mount(&server)
        .await;

    let detail = provider.test_connection().await.expect("probe failed");
    assert!(detail.contains("Contoso"));
}

#[tokio::test]
async fn test_connection_failure_is_classified() {
    let (server, provider) = common::setup_directory_mock().await;
    common::mount_error(
        &server,
        "GET",
        "/organization",
        403,
        "Authorization_RequestDenied",
        "Insufficient privileges to complete the operation.",
    )
    .await;

    let error = provider.test_connection().await.unwrap_err();
    assert!(matches!(error, DirectoryError::Auth(_)));
}
