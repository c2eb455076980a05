//! Ingest pipeline tests: multipart upload through the HTTP surface
//!
//! Drives `POST /upload` against real PostgreSQL + MinIO containers and
//! verifies the full contract: streamed bytes land verbatim in the object
//! store, the catalog records the observed size, and the admission checks
//! reject what they should.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestEnvironment;
use ldp_server::features::{self, files::FileCatalog};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tower::ServiceExt;

const BOUNDARY: &str = "ldp-test-boundary";

fn multipart_body(filename: &str, content_type: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(filename: &str, content_type: &str, payload: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(filename, content_type, payload)))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_upload_streams_to_store_and_creates_record() {
    let env = TestEnvironment::start().await.expect("environment");
    let router = features::router(env.feature_state());

    let payload = b"{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n";
    let response = router
        .oneshot(upload_request("data.jsonl", "application/json", payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "uploaded");
    let file_id = body["file_id"].as_str().expect("file_id").to_string();
    let key = body["key"].as_str().expect("key").to_string();
    assert!(key.starts_with("uploads/"));
    assert_eq!(body["metadata"]["size_bytes"], payload.len() as i64);
    assert_eq!(body["metadata"]["status"], "uploaded");

    // catalog record matches, and is reachable by object key too
    let catalog = FileCatalog::new(env.db_pool().clone());
    let record = catalog.get(&file_id).await.expect("get").expect("record");
    assert_eq!(record.object_key, key);
    assert_eq!(record.original_name, "data.jsonl");
    assert_eq!(record.size_bytes, payload.len() as i64);

    let by_key = catalog
        .get_by_key(&key)
        .await
        .expect("get_by_key")
        .expect("record");
    assert_eq!(by_key.id, record.id);

    // bytes land verbatim in the store
    let stream = env.storage().get_stream(&key).await.expect("get stream");
    let mut out = Vec::new();
    stream
        .into_async_read()
        .read_to_end(&mut out)
        .await
        .expect("read body");
    assert_eq!(out, payload);
}

#[tokio::test]
async fn test_upload_rejects_disallowed_mime_type() {
    let env = TestEnvironment::start().await.expect("environment");
    let router = features::router(env.feature_state());

    let response = router
        .oneshot(upload_request("image.png", "image/png", b"not really a png"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Upload failed");
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("image/png"));

    // no file record created
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
        .fetch_one(env.db_pool())
        .await
        .expect("count");
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let env = TestEnvironment::start().await.expect("environment");
    let router = features::router(env.feature_state());

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"comment\"\r\n\r\n");
    body.extend_from_slice(b"no file here");
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Upload failed");
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_over_size_limit_fails_without_record() {
    let mut config = common::test_config();
    config.upload.max_file_size = 1024;
    let env = TestEnvironment::start_with(config).await.expect("environment");
    let router = features::router(env.feature_state());

    let payload = vec![b'x'; 4096];
    let response = router
        .oneshot(upload_request("big.txt", "text/plain", &payload))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Upload failed");
    assert_eq!(
        body["message"],
        "File size exceeds maximum allowed size of 1024 bytes"
    );

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
        .fetch_one(env.db_pool())
        .await
        .expect("count");
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn test_upload_then_process_then_poll() {
    let env = TestEnvironment::start().await.expect("environment");
    let state = env.feature_state();
    let router = features::router(state.clone());

    let payload = b"{\"id\":1}\n{\"id\":2}\n";
    let response = router
        .clone()
        .oneshot(upload_request("data.jsonl", "application/json", payload))
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::OK);
    let file_id = body_json(response).await["file_id"]
        .as_str()
        .expect("file_id")
        .to_string();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/process/{file_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("process response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["state"], "queued");
    assert_eq!(body["file_id"], file_id.as_str());
    let job_id = body["job_id"].as_str().expect("job_id").to_string();

    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/jobs/{job_id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("poll response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["state"], "queued");
    assert_eq!(body["attempts"], 0);
    assert_eq!(body["progress"]["lines_processed"], 0);
}

#[tokio::test]
async fn test_list_files_after_upload() {
    let env = TestEnvironment::start().await.expect("environment");
    let router = features::router(env.feature_state());

    let response = router
        .clone()
        .oneshot(upload_request("a.jsonl", "application/json", b"{\"x\":1}\n"))
        .await
        .expect("upload");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/files?page=1&per_page=10&status=uploaded")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("list response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["files"][0]["original_name"], "a.jsonl");
    assert_eq!(body["files"][0]["status"], "uploaded");
}

#[tokio::test]
async fn test_process_unknown_file_is_404() {
    let env = TestEnvironment::start().await.expect("environment");
    let router = features::router(env.feature_state());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/process/000000000000000000000000")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "File not found");
}
