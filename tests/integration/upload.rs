//! Integration tests for uploads

use super::*;
use integrations_onedrive::errors::UploadError;
use wiremock::matchers::{body_json, body_string, header, method, path};

async fn mount_session(server: &MockServer, session_path: &str, expected_body: Value) {
    mock_with_auth("POST", session_path)
        .and(body_json(expected_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload/session-1", server.uri()),
            "expirationDateTime": "2030-01-01T00:00:00Z",
            "nextExpectedRanges": ["0-"]
        })))
        .expect(1)
        .mount(server)
        .await;
}

fn put_requests(requests: &[wiremock::Request]) -> Vec<&wiremock::Request> {
    requests
        .iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect()
}

#[tokio::test]
async fn test_session_upload_in_fragments() {
    let server = setup_mock_server().await;

    mount_session(
        &server,
        "/drive/items/root:/data.bin:/upload.createSession",
        json!({ "item": { "@name.conflictBehavior": "fail", "name": "data.bin" } }),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 0-2/5"))
        .and(body_string("hel"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "nextExpectedRanges": ["3-"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 3-4/5"))
        .and(body_string("lo"))
        .respond_with(ResponseTemplate::new(201).set_body_json(item_json("new-1", "data.bin")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_builder(&server, Dialect::Legacy)
        .max_fragment_size(3)
        .build()
        .unwrap();
    let item = client
        .uploads()
        .upload(
            &Address::root(),
            "data.bin",
            NameConflictBehavior::Fail,
            &b"hello"[..],
            5,
        )
        .await
        .unwrap();

    assert_eq!(item.id, "new-1");

    let requests = server.received_requests().await.unwrap();
    let puts = put_requests(&requests);
    assert_eq!(puts.len(), 2);
    assert_eq!(
        puts[0].headers.get("authorization").unwrap(),
        format!("Bearer {}", TEST_TOKEN).as_str()
    );
}

#[tokio::test]
async fn test_graph_session_body_omits_name() {
    let server = setup_mock_server().await;

    mount_session(
        &server,
        "/me/drive/items/root:/data.bin:/createUploadSession",
        json!({ "item": { "@microsoft.graph.conflictBehavior": "replace" } }),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .and(header("Content-Range", "bytes 0-4/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(item_json("new-1", "data.bin")))
        .expect(1)
        .mount(&server)
        .await;

    let client = graph_client(&server);
    let item = client
        .uploads()
        .upload(
            &Address::root(),
            "data.bin",
            NameConflictBehavior::Replace,
            &b"hello"[..],
            5,
        )
        .await
        .unwrap();

    assert_eq!(item.name, "data.bin");
}

#[tokio::test]
async fn test_session_upload_to_path_address() {
    let server = setup_mock_server().await;

    mount_session(
        &server,
        "/drive/root:/Backups/data.bin:/upload.createSession",
        json!({ "item": { "@name.conflictBehavior": "rename", "name": "data.bin" } }),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(item_json("new-1", "data.bin")))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    client
        .uploads()
        .upload(
            &Address::by_path("/Backups/data.bin"),
            "data.bin",
            NameConflictBehavior::Rename,
            &b"hello"[..],
            5,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_short_stream_fails_before_sending() {
    let server = setup_mock_server().await;

    mount_session(
        &server,
        "/drive/items/root:/data.bin:/upload.createSession",
        json!({ "item": { "@name.conflictBehavior": "fail", "name": "data.bin" } }),
    )
    .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .uploads()
        .upload(
            &Address::root(),
            "data.bin",
            NameConflictBehavior::Fail,
            &b"abc"[..],
            10,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Upload(UploadError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_empty_upload_rejects_content() {
    let server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .uploads()
        .upload(
            &Address::root(),
            "empty.txt",
            NameConflictBehavior::Replace,
            &b"abc"[..],
            0,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Upload(UploadError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_long_stream_fails_before_final_fragment() {
    let server = setup_mock_server().await;

    mount_session(
        &server,
        "/drive/items/root:/data.bin:/upload.createSession",
        json!({ "item": { "@name.conflictBehavior": "fail", "name": "data.bin" } }),
    )
    .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .uploads()
        .upload(
            &Address::root(),
            "data.bin",
            NameConflictBehavior::Fail,
            &b"hello, world"[..],
            5,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Upload(UploadError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_simple_upload_with_free_name() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/items/root/children")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("1", "other.txt")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_with_auth("PUT", "/drive/items/root:/empty.txt:/content")
        .and(body_string(""))
        .respond_with(ResponseTemplate::new(201).set_body_json(item_json("e1", "empty.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let item = client
        .uploads()
        .upload(
            &Address::root(),
            "empty.txt",
            NameConflictBehavior::Fail,
            &b""[..],
            0,
        )
        .await
        .unwrap();

    assert_eq!(item.id, "e1");
}

#[tokio::test]
async fn test_simple_upload_fail_policy_sends_nothing() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/items/root/children")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("1", "empty.txt")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let err = client
        .uploads()
        .upload(
            &Address::root(),
            "empty.txt",
            NameConflictBehavior::Fail,
            &b""[..],
            0,
        )
        .await
        .unwrap_err();

    assert!(err.is_name_already_exists());
}

#[tokio::test]
async fn test_simple_upload_rename_policy_picks_free_name() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/items/root/children")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [item_json("1", "empty.txt"), item_json("2", "empty 1.txt")]
        })))
        .mount(&server)
        .await;
    mock_with_auth("PUT", "/drive/items/root:/empty%202.txt:/content")
        .respond_with(ResponseTemplate::new(201).set_body_json(item_json("e2", "empty 2.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let client = legacy_client(&server);
    let item = client
        .uploads()
        .upload(
            &Address::root(),
            "empty.txt",
            NameConflictBehavior::Rename,
            &b""[..],
            0,
        )
        .await
        .unwrap();

    assert_eq!(item.name, "empty 2.txt");
}

#[tokio::test]
async fn test_simple_upload_rename_exhausted() {
    let server = setup_mock_server().await;

    mock_with_auth("GET", "/drive/items/root/children")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                item_json("1", "empty.txt"),
                item_json("2", "empty 1.txt"),
                item_json("3", "empty 2.txt")
            ]
        })))
        .mount(&server)
        .await;

    let client = client_builder(&server, Dialect::Legacy)
        .unused_filename_max_retries(2)
        .build()
        .unwrap();
    let err = client
        .uploads()
        .upload(
            &Address::root(),
            "empty.txt",
            NameConflictBehavior::Rename,
            &b""[..],
            0,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Upload(UploadError::RenameExhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn test_simple_upload_to_path_address_not_supported() {
    let server = setup_mock_server().await;

    let client = legacy_client(&server);
    let err = client
        .uploads()
        .upload(
            &Address::by_path("/Documents"),
            "empty.txt",
            NameConflictBehavior::Replace,
            &b""[..],
            0,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OneDriveError::Upload(UploadError::NotSupported(_))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}
