//! Enqueue job command
//!
//! Turns a "process this file" request into a durable `queued` job.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::files::FileCatalog;
use crate::features::jobs::{Job, JobQueue};
use crate::features::shared::validation::validate_object_id;

/// Command to enqueue processing of an uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueJobCommand {
    pub file_id: String,
}

/// Errors that can occur when enqueuing a job
#[derive(Debug, thiserror::Error)]
pub enum EnqueueJobError {
    #[error("Invalid fileId format")]
    InvalidId,
    #[error("File not found")]
    FileNotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<Job, EnqueueJobError>> for EnqueueJobCommand {}

pub async fn handle(
    queue: &JobQueue,
    catalog: &FileCatalog,
    command: EnqueueJobCommand,
) -> Result<Job, EnqueueJobError> {
    validate_object_id(&command.file_id, "fileId").map_err(|_| EnqueueJobError::InvalidId)?;

    let file = catalog
        .get(&command.file_id)
        .await?
        .ok_or(EnqueueJobError::FileNotFound)?;

    let job = queue.create(&file.id).await?;

    tracing::info!(job_id = %job.id, file_id = %file.id, "Processing job enqueued");

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_error_message() {
        assert_eq!(
            EnqueueJobError::InvalidId.to_string(),
            "Invalid fileId format"
        );
    }
}
