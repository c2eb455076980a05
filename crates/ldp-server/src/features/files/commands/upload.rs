//! Upload file command
//!
//! Streams one multipart file part into the object store and records the
//! result in the file catalog. The part is consumed chunk-by-chunk: bytes
//! flow through a fixed-size buffer into multipart part uploads, so resident
//! memory is independent of payload size. The byte count observed on the
//! inbound side becomes the file record's size.

use axum::extract::multipart::Field;
use bytes::Bytes;
use futures::Stream;
use mediator::Request;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UploadConfig;
use crate::db::DbError;
use crate::features::files::{FileCatalog, FileRecord};
use crate::storage::{self, Storage};

/// Command to ingest one uploaded file part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileCommand {
    /// Client-supplied filename
    pub original_name: String,
    /// MIME type declared on the file part
    pub content_type: String,
}

/// Response from a completed upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadFileResponse {
    pub file_id: String,
    pub key: String,
    pub metadata: FileRecord,
}

/// Errors that can occur during ingest
#[derive(Debug, Error)]
pub enum UploadFileError {
    /// Request body was not multipart/form-data
    #[error("Content-Type must be multipart/form-data")]
    NotMultipart,
    /// No `file` part was present in the request
    #[error("No file uploaded")]
    NoFile,
    /// The part's MIME type is not in the allowed list
    #[error("File type '{0}' is not allowed")]
    DisallowedType(String),
    /// The per-file byte limit was hit while streaming
    #[error("File size exceeds maximum allowed size of {0} bytes")]
    SizeExceeded(u64),
    /// The multipart stream failed mid-read
    #[error("Failed to read upload stream: {0}")]
    Multipart(String),
    /// The object store rejected or aborted the put
    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),
    /// The catalog insert failed
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<UploadFileResponse, UploadFileError>> for UploadFileCommand {}

/// Marker error injected into the byte stream when the per-file limit is
/// crossed, so the storage layer aborts the multipart upload and the
/// handler can tell the failure apart from infrastructure errors.
#[derive(Debug, Error)]
#[error("file size exceeds maximum allowed size of {0} bytes")]
struct SizeLimitExceeded(u64);

/// Handles the upload command for one multipart `file` part.
#[tracing::instrument(
    skip(storage, catalog, policy, field),
    fields(original_name = %command.original_name, content_type = %command.content_type)
)]
pub async fn handle(
    storage: &Storage,
    catalog: &FileCatalog,
    policy: &UploadConfig,
    command: UploadFileCommand,
    mut field: Field<'_>,
) -> Result<UploadFileResponse, UploadFileError> {
    // Compare the bare media type; clients may append parameters like
    // `; charset=utf-8`.
    let declared = command
        .content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let allowed = policy
        .allowed_file_types
        .iter()
        .any(|t| t.eq_ignore_ascii_case(&declared));

    if !allowed {
        // Drain the rejected part so the client is not left mid-send on a
        // stalled connection.
        while let Some(_chunk) = field
            .chunk()
            .await
            .map_err(|e| UploadFileError::Multipart(e.to_string()))?
        {}
        return Err(UploadFileError::DisallowedType(command.content_type));
    }

    let key = storage::key_gen(&command.original_name);
    let source = limited_stream(field, policy.max_file_size);

    let outcome = match storage
        .put_stream(&key, source, Some(&command.content_type))
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => {
            return Err(match err.downcast::<SizeLimitExceeded>() {
                Ok(limit) => UploadFileError::SizeExceeded(limit.0),
                Err(other) => UploadFileError::Storage(other),
            })
        },
    };

    let record = catalog
        .create(
            &outcome.key,
            &command.original_name,
            outcome.size as i64,
            &command.content_type,
        )
        .await?;

    tracing::info!(
        file_id = %record.id,
        key = %record.object_key,
        size = record.size_bytes,
        "File ingested"
    );

    Ok(UploadFileResponse {
        file_id: record.id.clone(),
        key: record.object_key.clone(),
        metadata: record,
    })
}

/// Adapt a multipart field into a byte stream that counts what it yields
/// and fails once the per-file limit is crossed.
fn limited_stream(
    field: Field<'_>,
    max_file_size: u64,
) -> impl Stream<Item = anyhow::Result<Bytes>> + Send + Unpin + '_ {
    Box::pin(futures::stream::try_unfold(
        (field, 0u64),
        move |(mut field, taken)| async move {
            match field.chunk().await {
                Ok(Some(bytes)) => {
                    let taken = taken + bytes.len() as u64;
                    if taken > max_file_size {
                        Err(anyhow::Error::new(SizeLimitExceeded(max_file_size)))
                    } else {
                        Ok(Some((bytes, (field, taken))))
                    }
                },
                Ok(None) => Ok(None),
                Err(err) => Err(anyhow::anyhow!("multipart stream error: {err}")),
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_exceeded_message_names_the_limit() {
        let err = UploadFileError::SizeExceeded(5_368_709_120);
        assert_eq!(
            err.to_string(),
            "File size exceeds maximum allowed size of 5368709120 bytes"
        );
    }

    #[test]
    fn test_disallowed_type_message() {
        let err = UploadFileError::DisallowedType("image/png".to_string());
        assert!(err.to_string().contains("image/png"));
        assert!(err.to_string().contains("not allowed"));
    }
}
