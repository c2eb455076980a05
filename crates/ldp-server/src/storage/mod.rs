//! Object-store adapter
//!
//! Streams uploads into an S3-compatible store and streams objects back out.
//! Bodies of unknown length go through the multipart protocol with bounded
//! part concurrency, so memory stays O(part_size × parts_in_flight) no
//! matter how large the payload is. Bodies smaller than one part use a
//! single `PutObject`.

use anyhow::{Context, Result};
use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    primitives::ByteStream,
    Client,
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::{Stream, StreamExt};
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub mod config;
mod multipart;

use multipart::MultipartUpload;

/// Minimum multipart part size accepted by S3 (5 MiB).
pub const PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum part uploads in flight per put.
pub const MAX_PARTS_IN_FLIGHT: usize = 4;

/// Result of a completed streaming put
#[derive(Debug, Clone)]
pub struct PutOutcome {
    pub key: String,
    pub etag: Option<String>,
    /// Exact byte count consumed from the source stream.
    pub size: u64,
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(config: config::StorageConfig) -> Result<Self> {
        debug!("Initializing storage with config: {:?}", config);

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "ldp-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!("Storage client initialized for bucket: {}", config.bucket);

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a stream of unknown total length.
    ///
    /// Parts are cut at [`PART_SIZE`] and uploaded with at most
    /// [`MAX_PARTS_IN_FLIGHT`] concurrent part requests. If anything fails
    /// mid-flight, whether the source stream or a part request, the multipart
    /// upload is aborted so no orphan parts remain.
    #[instrument(skip(self, source))]
    pub async fn put_stream<S>(
        &self,
        key: &str,
        source: S,
        content_type: Option<&str>,
    ) -> Result<PutOutcome>
    where
        S: Stream<Item = Result<Bytes>> + Send + Unpin,
    {
        let mut upload: Option<MultipartUpload> = None;

        match self
            .put_stream_inner(key, source, content_type, &mut upload)
            .await
        {
            Ok(outcome) => {
                info!(
                    key = %outcome.key,
                    size = outcome.size,
                    "Streamed object to s3://{}/{}",
                    self.bucket,
                    outcome.key
                );
                Ok(outcome)
            },
            Err(err) => {
                if let Some(pending) = upload.take() {
                    pending.abort().await;
                }
                Err(err)
            },
        }
    }

    async fn put_stream_inner<S>(
        &self,
        key: &str,
        mut source: S,
        content_type: Option<&str>,
        upload: &mut Option<MultipartUpload>,
    ) -> Result<PutOutcome>
    where
        S: Stream<Item = Result<Bytes>> + Send + Unpin,
    {
        let mut buf = BytesMut::new();
        let mut total: u64 = 0;

        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            total += chunk.len() as u64;
            buf.extend_from_slice(&chunk);

            if buf.len() >= PART_SIZE && upload.is_none() {
                *upload = Some(
                    MultipartUpload::begin(
                        &self.client,
                        &self.bucket,
                        key,
                        content_type,
                        MAX_PARTS_IN_FLIGHT,
                    )
                    .await?,
                );
            }

            if let Some(pending) = upload.as_mut() {
                while buf.len() >= PART_SIZE {
                    pending.push_part(buf.split_to(PART_SIZE).freeze()).await?;
                }
            }
        }

        match upload.as_mut() {
            // Everything fit below one part: a plain put is cheaper and has
            // no multipart state to clean up.
            None => {
                let resp = self
                    .client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .set_content_type(content_type.map(str::to_string))
                    .body(ByteStream::from(buf.freeze()))
                    .send()
                    .await
                    .context("Failed to upload object")?;

                Ok(PutOutcome {
                    key: key.to_string(),
                    etag: resp.e_tag().map(str::to_string),
                    size: total,
                })
            },
            // The upload stays owned by the caller-visible slot until
            // completion succeeds, so a failure uploading the tail part or
            // completing the upload still reaches the abort path.
            Some(pending) => {
                if !buf.is_empty() {
                    pending.push_part(buf.freeze()).await?;
                }
                let etag = pending.finish().await?;
                *upload = None;

                Ok(PutOutcome {
                    key: key.to_string(),
                    etag,
                    size: total,
                })
            },
        }
    }

    /// Open a readable byte stream for an object. Back-pressure is
    /// consumer-driven: bytes are pulled from the connection as the caller
    /// reads.
    #[instrument(skip(self))]
    pub async fn get_stream(&self, key: &str) -> Result<ByteStream> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to open object stream: {}", key))?;

        debug!("Opened object stream for s3://{}/{}", self.bucket, key);

        Ok(resp.body)
    }

    /// Cheap reachability check on the configured bucket.
    pub async fn probe(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}

/// Derive a fresh object key for an uploaded file:
/// `uploads/<YYYY-MM-DD>/<epoch-millis>-<6-char-random>-<sanitized-name>`.
/// The date component is UTC.
pub fn key_gen(original_name: &str) -> String {
    let now = Utc::now();
    let token = Uuid::new_v4().simple().to_string();

    format!(
        "uploads/{}/{}-{}-{}",
        now.format("%Y-%m-%d"),
        now.timestamp_millis(),
        &token[..6],
        sanitize_object_name(original_name)
    )
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
fn sanitize_object_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_object_name("report-2026.jsonl"), "report-2026.jsonl");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_object_name("my file (1).txt"), "my_file__1_.txt");
        assert_eq!(sanitize_object_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_object_name("naïve.csv"), "na_ve.csv");
    }

    #[test]
    fn test_key_gen_shape() {
        let key = key_gen("data (final).csv");
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "uploads");
        // date component: YYYY-MM-DD
        assert_eq!(parts[1].len(), 10);
        assert!(parts[2].ends_with("data__final_.csv"));
        // epoch-millis and the random token are separated by dashes
        let segments: Vec<&str> = parts[2].splitn(3, '-').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments[0].parse::<i64>().is_ok());
        assert_eq!(segments[1].len(), 6);
    }

    #[test]
    fn test_key_gen_is_unique_per_call() {
        assert_ne!(key_gen("same.txt"), key_gen("same.txt"));
    }
}
