//! Integration tests for token refresh

use super::*;
use futures::future::join_all;
use secrecy::ExposeSecret;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_string_contains, header, method, path};

fn token_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "token_type": "bearer",
        "access_token": "new-access",
        "refresh_token": "new-refresh",
        "expires_in": 3600
    }))
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .and(body_string_contains("client_id=client-id"))
        .respond_with(token_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/items/abc"))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_json("abc", "a.txt")))
        .expect(5)
        .mount(&server)
        .await;

    let persisted = Arc::new(Mutex::new(None));
    let sink = persisted.clone();
    let auth = expired_auth(&server).on_token_refresh(move |tokens| {
        *sink.lock().unwrap() = Some(tokens.refresh_token().expose_secret().clone());
    });

    let client = OneDriveClient::builder()
        .auth_provider(auth)
        .base_url(server.uri())
        .build()
        .unwrap();
    let items = client.items();
    let address = Address::by_id("abc");

    let results = join_all((0..5).map(|_| items.get(&address))).await;
    for result in results {
        assert_eq!(result.unwrap().id, "abc");
    }

    assert_eq!(persisted.lock().unwrap().as_deref(), Some("new-refresh"));
    server.verify().await;
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let auth = expired_auth(&server);
    let token = auth.valid_token().await.unwrap();
    assert_eq!(token.expose_secret(), "new-access");

    let state = auth.snapshot().await;
    assert_eq!(state.refresh_token().expose_secret(), "old-refresh");
    assert!(!state.needs_refresh());
}

#[tokio::test]
async fn test_forced_refresh() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response())
        .expect(1)
        .mount(&server)
        .await;

    let auth = test_auth(&server);
    auth.refresh().await.unwrap();

    let token = auth.valid_token().await.unwrap();
    assert_eq!(token.expose_secret(), "new-access");
}

#[tokio::test]
async fn test_invalid_grant_surfaces_on_request() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The refresh token has expired."
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/items/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_json("abc", "a.txt")))
        .expect(0)
        .mount(&server)
        .await;

    let client = OneDriveClient::builder()
        .auth_provider(expired_auth(&server))
        .base_url(server.uri())
        .build()
        .unwrap();
    let err = client
        .items()
        .get(&Address::by_id("abc"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_grant());
    assert_eq!(
        err.api_error().unwrap().message,
        "The refresh token has expired."
    );
}
