//! Storage configuration
//!
//! Configuration for S3-compatible object stores, covering both AWS S3 and
//! MinIO. Values load from environment variables or the helper constructors.

use ldp_common::LdpError;
use serde::{Deserialize, Serialize};
use std::env;

// ============================================================================
// Storage Configuration Constants
// ============================================================================

/// Default region when not specified via environment variable.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default bucket name when not specified via environment variable.
pub const DEFAULT_BUCKET: &str = "ldp-uploads";

/// Default MinIO access key for local development.
pub const DEFAULT_MINIO_ACCESS_KEY: &str = "minioadmin";

/// Default MinIO secret key for local development.
pub const DEFAULT_MINIO_SECRET_KEY: &str = "minioadmin";

/// Configuration for the object-store adapter
///
/// # Environment Variables
///
/// - `S3_ENDPOINT` - custom endpoint for MinIO or other S3-compatibles
/// - `AWS_REGION` / `S3_REGION` - region (default `us-east-1`)
/// - `S3_BUCKET` - bucket name; an `s3://` prefix and any trailing path are
///   stripped, so `s3://my-bucket/some/prefix` becomes `my-bucket`
/// - `AWS_ACCESS_KEY_ID` / `S3_ACCESS_KEY` - access key
/// - `AWS_SECRET_ACCESS_KEY` / `S3_SECRET_KEY` - secret key
/// - `S3_PATH_STYLE` - use path-style addressing (required by MinIO)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

impl StorageConfig {
    /// Creates a StorageConfig from environment variables with local-MinIO
    /// fallbacks.
    pub fn from_env() -> anyhow::Result<Self> {
        let bucket = normalize_bucket(
            &env::var("S3_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
        );
        if bucket.is_empty() {
            return Err(LdpError::config(
                "S3_BUCKET resolves to an empty bucket name",
                "Set S3_BUCKET to a bare bucket name like 'ldp-uploads'",
            )
            .into());
        }

        Ok(Self {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("AWS_REGION")
                .or_else(|_| env::var("S3_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
            bucket,
            access_key: env::var("AWS_ACCESS_KEY_ID")
                .or_else(|_| env::var("S3_ACCESS_KEY"))
                .unwrap_or_else(|_| DEFAULT_MINIO_ACCESS_KEY.to_string()),
            secret_key: env::var("AWS_SECRET_ACCESS_KEY")
                .or_else(|_| env::var("S3_SECRET_KEY"))
                .unwrap_or_else(|_| DEFAULT_MINIO_SECRET_KEY.to_string()),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        })
    }

    /// Configuration for a local MinIO instance.
    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: DEFAULT_REGION.to_string(),
            bucket: normalize_bucket(&bucket.into()),
            access_key: DEFAULT_MINIO_ACCESS_KEY.to_string(),
            secret_key: DEFAULT_MINIO_SECRET_KEY.to_string(),
            path_style: true,
        }
    }
}

/// Reduce a bucket value to the bare bucket name: strips an `s3://` scheme
/// prefix and anything after the first `/`.
pub fn normalize_bucket(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed.strip_prefix("s3://").unwrap_or(trimmed);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_bucket() {
        assert_eq!(normalize_bucket("my-bucket"), "my-bucket");
    }

    #[test]
    fn test_normalize_strips_scheme() {
        assert_eq!(normalize_bucket("s3://my-bucket"), "my-bucket");
    }

    #[test]
    fn test_normalize_strips_trailing_path() {
        assert_eq!(normalize_bucket("s3://my-bucket/some/prefix"), "my-bucket");
        assert_eq!(normalize_bucket("my-bucket/uploads"), "my-bucket");
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(normalize_bucket("  my-bucket  "), "my-bucket");
    }

    #[test]
    fn test_for_minio_uses_path_style() {
        let config = StorageConfig::for_minio("http://localhost:9000", "test-bucket");
        assert!(config.path_style);
        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
    }
}
