//! Object-store adapter tests against MinIO
//!
//! The round-trip law: bytes streamed in under a key come back verbatim.
//! Large bodies exercise the multipart path (parts ≥ 5 MiB, bounded
//! concurrency); small bodies the single-put path.

mod common;

use bytes::Bytes;
use common::TestMinio;
use tokio::io::AsyncReadExt;

fn chunked(body: &[u8], chunk_size: usize) -> Vec<anyhow::Result<Bytes>> {
    body.chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect()
}

async fn read_back(minio: &TestMinio, key: &str) -> Vec<u8> {
    let stream = minio.storage().get_stream(key).await.expect("get stream");
    let mut reader = stream.into_async_read();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.expect("read body");
    out
}

#[tokio::test]
async fn test_small_body_round_trip() {
    let minio = TestMinio::start().await.expect("minio");

    let body = b"line one\nline two\n".to_vec();
    let key = ldp_server::storage::key_gen("small.txt");
    let source = Box::pin(futures::stream::iter(chunked(&body, 5)));

    let outcome = minio
        .storage()
        .put_stream(&key, source, Some("text/plain"))
        .await
        .expect("put stream");

    assert_eq!(outcome.size, body.len() as u64);
    assert_eq!(outcome.key, key);
    assert_eq!(read_back(&minio, &key).await, body);
}

#[tokio::test]
async fn test_multipart_body_round_trip() {
    let minio = TestMinio::start().await.expect("minio");

    // 12 MiB: two full 5 MiB parts plus a 2 MiB tail
    let mut body = Vec::with_capacity(12 * 1024 * 1024);
    for i in 0..(12 * 1024 * 1024 / 16) {
        body.extend_from_slice(format!("{:015}\n", i).as_bytes());
    }

    let key = ldp_server::storage::key_gen("large.txt");
    let source = Box::pin(futures::stream::iter(chunked(&body, 64 * 1024)));

    let outcome = minio
        .storage()
        .put_stream(&key, source, Some("text/plain"))
        .await
        .expect("put stream");

    assert_eq!(outcome.size, body.len() as u64);
    assert_eq!(read_back(&minio, &key).await, body);
}

#[tokio::test]
async fn test_source_error_aborts_the_put() {
    let minio = TestMinio::start().await.expect("minio");

    let key = ldp_server::storage::key_gen("broken.txt");
    let chunks: Vec<anyhow::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"some data")),
        Err(anyhow::anyhow!("client went away")),
    ];
    let source = Box::pin(futures::stream::iter(chunks));

    let err = minio
        .storage()
        .put_stream(&key, source, None)
        .await
        .expect_err("put must fail");
    assert!(err.to_string().contains("client went away"));

    // nothing persisted under the key
    assert!(minio.storage().get_stream(&key).await.is_err());
}

#[tokio::test]
async fn test_probe_reports_bucket_reachability() {
    let minio = TestMinio::start().await.expect("minio");
    assert!(minio.storage().probe().await);
}
