//! Drive Client Tests
//!
//! Runs the Drive client against a local mock of the Drive v3 endpoints.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use drivesync::config::DriveConfig;
use drivesync::storage::{
    DriveClient, ListQuery, NewEntry, RemoteStorage, StaticToken, FOLDER_MIME_TYPE,
};
use drivesync::{StagedUpload, SyncError};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const TOKEN: &str = "test-token";

#[derive(Default)]
struct MockDrive {
    addr: Option<SocketAddr>,
    queries: Mutex<Vec<HashMap<String, String>>>,
    metadata: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

type Shared = Arc<MockDrive>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn drive_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

async fn list_files(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return drive_error(StatusCode::UNAUTHORIZED, "Invalid Credentials");
    }
    let page = params.get("pageToken").cloned();
    state.queries.lock().unwrap().push(params);

    match page.as_deref() {
        None => Json(json!({
            "nextPageToken": "page-2",
            "files": [{
                "id": "f2",
                "name": "newer.jpg",
                "mimeType": "image/jpeg",
                "createdTime": "2025-10-12T10:00:00.000Z"
            }]
        }))
        .into_response(),
        Some("page-2") => Json(json!({
            "files": [{
                "id": "f1",
                "name": "older.jpg",
                "mimeType": "image/jpeg",
                "createdTime": "2025-10-12T09:00:00.000Z"
            }]
        }))
        .into_response(),
        Some(_) => drive_error(StatusCode::BAD_REQUEST, "Invalid page token"),
    }
}

async fn create_metadata(State(state): State<Shared>, Json(metadata): Json<Value>) -> Response {
    state.metadata.lock().unwrap().push(metadata.clone());
    Json(json!({
        "id": "folder-1",
        "name": metadata["name"],
        "mimeType": metadata["mimeType"],
    }))
    .into_response()
}

async fn start_session(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    Json(metadata): Json<Value>,
) -> Response {
    if params.get("uploadType").map(String::as_str) != Some("resumable") {
        return drive_error(StatusCode::BAD_REQUEST, "uploadType must be resumable");
    }
    state.metadata.lock().unwrap().push(metadata);
    let location = format!("http://{}/upload-session/s1", state.addr.unwrap());
    (StatusCode::OK, [(header::LOCATION, location)]).into_response()
}

async fn finish_session(
    State(state): State<Shared>,
    Path(session): Path<String>,
    body: Bytes,
) -> Response {
    state
        .uploads
        .lock()
        .unwrap()
        .push((session, body.to_vec()));
    Json(json!({
        "id": "file-1",
        "name": "photo.jpg",
        "mimeType": "image/jpeg",
        "webViewLink": "https://drive.google.com/file/d/file-1/view"
    }))
    .into_response()
}

async fn download(
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("alt").map(String::as_str) != Some("media") {
        return drive_error(StatusCode::BAD_REQUEST, "alt=media required");
    }
    match id.as_str() {
        "f1" => (StatusCode::OK, "file one content").into_response(),
        _ => drive_error(StatusCode::NOT_FOUND, &format!("File not found: {id}")),
    }
}

async fn start_mock() -> (Shared, DriveConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(MockDrive {
        addr: Some(addr),
        ..Default::default()
    });

    let router = Router::new()
        .route("/drive/v3/files", get(list_files).post(create_metadata))
        .route("/drive/v3/files/:id", get(download))
        .route("/upload/drive/v3/files", post(start_session))
        .route("/upload-session/:id", put(finish_session))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let config = DriveConfig {
        api_base_url: format!("http://{addr}/drive/v3"),
        upload_base_url: format!("http://{addr}/upload/drive/v3"),
        ..Default::default()
    };
    (state, config)
}

fn client(config: &DriveConfig, token: &str) -> DriveClient {
    DriveClient::new(config, Arc::new(StaticToken::new(token))).unwrap()
}

#[tokio::test]
async fn test_list_follows_pages() {
    let (state, config) = start_mock().await;
    let drive = client(&config, TOKEN);

    let entries = drive.list(&ListQuery::children_of("root")).await.unwrap();

    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["newer.jpg", "older.jpg"]);
    assert!(entries[0].created_time > entries[1].created_time);

    let queries = state.queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0]["q"], "'root' in parents and trashed = false");
    assert_eq!(queries[0]["orderBy"], "createdTime desc");
    assert_eq!(queries[1]["pageToken"], "page-2");
}

#[tokio::test]
async fn test_list_surfaces_service_message() {
    let (_state, config) = start_mock().await;
    let drive = client(&config, "wrong-token");

    let result = drive.list(&ListQuery::children_of("root")).await;

    match result {
        Err(SyncError::Remote { status, message }) => {
            assert_eq!(status, Some(401));
            assert_eq!(message, "Invalid Credentials");
        }
        other => panic!("Expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_folder() {
    let (state, config) = start_mock().await;
    let drive = client(&config, TOKEN);

    let created = drive
        .create(&NewEntry::folder("MAIN", "root"), None)
        .await
        .unwrap();

    assert_eq!(created.id, "folder-1");
    assert!(created.is_folder());
    let metadata = state.metadata.lock().unwrap();
    assert_eq!(
        metadata[0],
        json!({"name": "MAIN", "parents": ["root"], "mimeType": FOLDER_MIME_TYPE})
    );
}

#[tokio::test]
async fn test_resumable_upload_streams_body() {
    let (state, config) = start_mock().await;
    let drive = client(&config, TOKEN);

    let mut staged = StagedUpload::from_bytes("photo.jpg", "image/jpeg", b"jpeg payload")
        .await
        .unwrap();
    let body = staged.open_body().await.unwrap();
    let entry = NewEntry::file("photo.jpg", "folder-1", "image/jpeg");

    let created = drive.create(&entry, Some(body)).await.unwrap();

    assert_eq!(created.id, "file-1");
    assert_eq!(
        created.web_view_link.as_deref(),
        Some("https://drive.google.com/file/d/file-1/view")
    );
    let uploads = state.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, "s1");
    assert_eq!(uploads[0].1, b"jpeg payload");
    assert_eq!(state.metadata.lock().unwrap()[0]["parents"], json!(["folder-1"]));
}

#[tokio::test]
async fn test_download_streams_content() {
    let (_state, config) = start_mock().await;
    let drive = client(&config, TOKEN);

    let mut stream = drive.download("f1").await.unwrap();
    let mut content = Vec::new();
    while let Some(chunk) = stream.next().await {
        content.extend_from_slice(&chunk.unwrap());
    }

    assert_eq!(content, b"file one content");
}

#[tokio::test]
async fn test_download_not_found() {
    let (_state, config) = start_mock().await;
    let drive = client(&config, TOKEN);

    let result = drive.download("missing").await;

    assert!(matches!(
        result,
        Err(SyncError::Remote {
            status: Some(404),
            ..
        })
    ));
}
