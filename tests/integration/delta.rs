//! Integration tests for delta enumeration

use super::*;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path, query_param};

#[tokio::test]
async fn test_list_all_delta_concatenates_pages() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/items/root/view.delta")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("1", "a.txt")],
            "@odata.nextLink": format!("{}/delta-page-2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("GET", "/delta-page-2")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("2", "b.txt")],
            "@odata.nextLink": format!("{}/delta-page-3", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("GET", "/delta-page-3")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("3", "c.txt"), { "id": "4", "name": "old.txt", "deleted": {} }],
            "@odata.deltaLink": format!("{}/drive/items/root/view.delta?token=cursor-3", server.uri()),
            "@delta.token": "cursor-3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let result = client
        .delta()
        .list_all_delta(&Address::root(), None)
        .await
        .unwrap();

    let ids: Vec<_> = result.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    assert!(result.items[3].is_deleted());
    assert_eq!(result.token.as_deref(), Some("cursor-3"));
    assert!(result.delta_link.unwrap().ends_with("token=cursor-3"));
}

#[tokio::test]
async fn test_delta_resumes_from_token() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/root:/Documents:/view.delta")
        .and(query_param("token", "old-cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [],
            "@delta.token": "new-cursor"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let result = assert_ok!(
        client
            .delta()
            .list_all_delta(&Address::by_path("/Documents"), Some("old-cursor"))
            .await
    );

    assert!(result.items.is_empty());
    assert_eq!(result.token.as_deref(), Some("new-cursor"));
}

#[tokio::test]
async fn test_graph_token_taken_from_delta_link() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/me/drive/items/root/delta")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("1", "a.txt")],
            "@odata.deltaLink": format!("{}/me/drive/root/delta?token=graph-cursor", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = graph_client(&server);
    let result = client
        .delta()
        .list_all_delta(&Address::root(), None)
        .await
        .unwrap();

    assert_eq!(result.items.len(), 1);
    assert_eq!(result.token.as_deref(), Some("graph-cursor"));
}

#[tokio::test]
async fn test_stale_cursor_requires_resync() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/root/view.delta"))
        .respond_with(error_response(410, "resyncRequired", "Resync required"))
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = assert_err!(
        client
            .delta()
            .list_all_delta(&Address::root(), Some("stale"))
            .await
    );

    assert!(err.is_resync_required());
    assert_eq!(err.code(), Some("resyncRequired"));
}

#[tokio::test]
async fn test_gone_without_known_code_requires_resync() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/drive/items/root/view.delta"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .delta()
        .delta(&Address::root(), None, Some("stale"))
        .await
        .unwrap_err();

    assert!(err.is_resync_required());
}
