//! Integration tests for server-side copies

use super::*;
use integrations_onedrive::errors::CopyError;
use std::time::Duration as StdDuration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};

fn monitor_url(server: &MockServer) -> String {
    format!("{}/monitor/op-1", server.uri())
}

fn progress(status: &str) -> ResponseTemplate {
    ResponseTemplate::new(202).set_body_json(json!({
        "operation": "ItemCopy",
        "percentageComplete": 40.0,
        "status": status
    }))
}

#[tokio::test]
async fn test_copy_returns_monitor_url() {
    let server = setup_mock_server().await;

    mock_with_auth("POST", "/drive/items/abc/action.copy")
        .and(header("Prefer", "respond-async"))
        .and(body_json(json!({
            "name": "copy.txt",
            "parentReference": { "id": "folder-2" }
        })))
        .respond_with(
            ResponseTemplate::new(202).insert_header("Location", monitor_url(&server).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let body = ItemCopyBody {
        name: Some("copy.txt".to_string()),
        parent_reference: Some(ItemReference::by_id("folder-2")),
    };
    let monitor = client
        .copies()
        .copy(&Address::by_id("abc"), &body)
        .await
        .unwrap();

    assert_eq!(monitor, monitor_url(&server));
}

#[tokio::test]
async fn test_copy_without_location() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/me/drive/items/abc/copy"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let client = graph_client(&server);
    let err = client
        .copies()
        .copy(&Address::by_id("abc"), &ItemCopyBody::default())
        .await
        .unwrap_err();

    assert!(matches!(err, OneDriveError::Copy(CopyError::MissingMonitorUrl)));
}

#[tokio::test]
async fn test_legacy_copy_await_follows_see_other() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/monitor/op-1")
        .respond_with(progress("inProgress"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("GET", "/monitor/op-1")
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", format!("{}/drive/items/new-id", server.uri()).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("GET", "/drive/items/new-id")
        .respond_with(ResponseTemplate::new(200).set_body_json(item_json("new-id", "copy.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let item = client
        .copies()
        .copy_await(&monitor_url(&server))
        .await
        .unwrap();

    assert_eq!(item.id, "new-id");
}

#[tokio::test]
async fn test_graph_copy_completed_without_item() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "percentageComplete": 100.0,
            "resourceId": "new-id"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = graph_client(&server);
    let err = client
        .copies()
        .copy_await(&monitor_url(&server))
        .await
        .unwrap_err();

    match err {
        OneDriveError::Copy(CopyError::CompletedNoItem { resource_id }) => {
            assert_eq!(resource_id.as_deref(), Some("new-id"));
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_copy_failure_stops_polling() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(progress("failed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .copies()
        .copy_await(&monitor_url(&server))
        .await
        .unwrap_err();

    assert!(matches!(err, OneDriveError::Copy(CopyError::Failed(_))));
}

#[tokio::test]
async fn test_copy_poll_timeout() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(progress("inProgress"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_builder(&server, Dialect::Legacy)
        .copy_poll_max_attempts(3)
        .build()
        .unwrap();
    let err = client
        .copies()
        .copy_await(&monitor_url(&server))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Copy(CopyError::Timeout { attempts: 3 })
    ));
}

#[tokio::test]
async fn test_copy_await_cancelled() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/monitor/op-1"))
        .respond_with(progress("inProgress"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_builder(&server, Dialect::Legacy)
        .copy_poll_interval(StdDuration::from_secs(60))
        .build()
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = client
        .copies()
        .copy_await_with_cancellation(&monitor_url(&server), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, OneDriveError::Copy(CopyError::Cancelled)));
}

#[tokio::test]
async fn test_copy_status_single_poll() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/monitor/op-1")
        .respond_with(progress("notStarted"))
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let status = client
        .copies()
        .copy_status(&monitor_url(&server))
        .await
        .unwrap();

    match status {
        CopyStatus::Pending(status) => {
            assert_eq!(status.operation.as_deref(), Some("ItemCopy"));
            assert_eq!(status.percentage_complete, 40.0);
        }
        CopyStatus::Done(_) => panic!("copy should still be pending"),
    }
}
