//! Integration tests using WireMock
//!
//! These tests run the client against a mock HTTP server and check the full
//! request/response cycle: path rendering, authentication, status handling
//! and error mapping.

mod auth;
mod copy;
mod delta;
mod upload;

use chrono::{Duration, Utc};
use integrations_onedrive::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Access token held by the default test provider.
pub const TEST_TOKEN: &str = "test-token";

/// Helper to create a mock server.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Token provider whose token stays valid for the whole test, pointed at the
/// mock server's `/token` endpoint.
pub fn test_auth(server: &MockServer) -> OneDriveAuth {
    auth_expiring_at(server, Utc::now() + Duration::hours(1))
}

/// Token provider with an already expired access token.
pub fn expired_auth(server: &MockServer) -> OneDriveAuth {
    auth_expiring_at(server, Utc::now() - Duration::hours(1))
}

fn auth_expiring_at(server: &MockServer, expires_at: chrono::DateTime<Utc>) -> OneDriveAuth {
    OneDriveAuth::new(
        OAuthCredentials::new("client-id", "client-secret", "https://localhost/callback"),
        TokenState::new(TEST_TOKEN, "old-refresh", expires_at),
        Dialect::Legacy,
    )
    .expect("Failed to create auth provider")
    .with_token_url(format!("{}/token", server.uri()))
}

/// Client builder pointed at the mock server.
pub fn client_builder(server: &MockServer, dialect: Dialect) -> OneDriveClientBuilder {
    OneDriveClient::builder()
        .auth_provider(test_auth(server))
        .dialect(dialect)
        .base_url(server.uri())
        .copy_poll_interval(std::time::Duration::from_millis(1))
}

/// Legacy-dialect client pointed at the mock server.
pub fn legacy_client(server: &MockServer) -> OneDriveClient {
    client_builder(server, Dialect::Legacy)
        .build()
        .expect("Failed to build client")
}

/// Graph-dialect client pointed at the mock server.
pub fn graph_client(server: &MockServer) -> OneDriveClient {
    client_builder(server, Dialect::Graph)
        .build()
        .expect("Failed to build client")
}

/// Helper to create an authenticated mock.
pub fn mock_with_auth(method_matcher: &str, path_matcher: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
}

/// Item document as the service returns it.
pub fn item_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "size": 5,
        "eTag": format!("etag-{}", id),
        "file": { "mimeType": "text/plain" },
        "parentReference": { "driveId": "drive-1", "id": "root" }
    })
}

/// Service error response.
pub fn error_response(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "error": { "code": code, "message": message }
    }))
}
