//! Multipart upload state machine
//!
//! Tracks one in-flight multipart upload: hands parts to a bounded set of
//! concurrent upload tasks, collects their etags, and either completes the
//! upload or aborts it so the store holds no orphan parts.

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::{
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
    Client,
};
use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub(super) struct MultipartUpload {
    client: Client,
    bucket: String,
    key: String,
    upload_id: String,
    next_part_number: i32,
    max_in_flight: usize,
    tasks: JoinSet<Result<CompletedPart>>,
    completed: Vec<CompletedPart>,
}

impl MultipartUpload {
    pub(super) async fn begin(
        client: &Client,
        bucket: &str,
        key: &str,
        content_type: Option<&str>,
        max_in_flight: usize,
    ) -> Result<Self> {
        let resp = client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .set_content_type(content_type.map(str::to_string))
            .send()
            .await
            .context("Failed to initiate multipart upload")?;

        let upload_id = resp
            .upload_id()
            .ok_or_else(|| anyhow!("object store returned no multipart upload id"))?
            .to_string();

        debug!(key = %key, upload_id = %upload_id, "Multipart upload initiated");

        Ok(Self {
            client: client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            next_part_number: 1,
            max_in_flight,
            tasks: JoinSet::new(),
            completed: Vec::new(),
        })
    }

    /// Queue one part for upload, waiting for a concurrency slot first.
    pub(super) async fn push_part(&mut self, body: Bytes) -> Result<()> {
        while self.tasks.len() >= self.max_in_flight {
            self.collect_one().await?;
        }

        let part_number = self.next_part_number;
        self.next_part_number += 1;

        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = self.key.clone();
        let upload_id = self.upload_id.clone();

        self.tasks.spawn(async move {
            let resp = client
                .upload_part()
                .bucket(&bucket)
                .key(&key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body))
                .send()
                .await
                .with_context(|| format!("Failed to upload part {}", part_number))?;

            Ok(CompletedPart::builder()
                .part_number(part_number)
                .set_e_tag(resp.e_tag().map(str::to_string))
                .build())
        });

        Ok(())
    }

    async fn collect_one(&mut self) -> Result<()> {
        if let Some(joined) = self.tasks.join_next().await {
            let part = joined.context("part upload task panicked")??;
            self.completed.push(part);
        }
        Ok(())
    }

    /// Wait for every queued part and complete the upload. Returns the
    /// assembled object's etag. On error the upload is still open and must
    /// be aborted by the caller.
    pub(super) async fn finish(&mut self) -> Result<Option<String>> {
        while !self.tasks.is_empty() {
            self.collect_one().await?;
        }

        // Completion requires parts in ascending part-number order.
        self.completed
            .sort_by_key(|part| part.part_number().unwrap_or(i32::MAX));
        let parts = std::mem::take(&mut self.completed);
        let part_count = parts.len();

        let resp = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .context("Failed to complete multipart upload")?;

        debug!(
            key = %self.key,
            parts = part_count,
            "Multipart upload completed"
        );

        Ok(resp.e_tag().map(str::to_string))
    }

    /// Drop all in-flight part tasks and abort the upload server-side.
    pub(super) async fn abort(mut self) {
        self.tasks.abort_all();

        if let Err(err) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(&self.key)
            .upload_id(&self.upload_id)
            .send()
            .await
        {
            warn!(
                key = %self.key,
                upload_id = %self.upload_id,
                error = %err,
                "Failed to abort multipart upload; parts may be orphaned"
            );
        }
    }
}
