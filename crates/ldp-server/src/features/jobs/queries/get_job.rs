//! Get job query
//!
//! Clients poll this until the job reaches a terminal state.

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::jobs::{Job, JobQueue};
use crate::features::shared::validation::validate_object_id;

/// Query to get a job by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: String,
}

/// Error type for get job query
#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Invalid jobId format")]
    InvalidId,
    #[error("Job not found")]
    NotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<Job, GetJobError>> for GetJobQuery {}

pub async fn handle(queue: &JobQueue, query: GetJobQuery) -> Result<Job, GetJobError> {
    validate_object_id(&query.job_id, "jobId").map_err(|_| GetJobError::InvalidId)?;

    queue.get(&query.job_id).await?.ok_or(GetJobError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_id_error_message() {
        assert_eq!(GetJobError::InvalidId.to_string(), "Invalid jobId format");
    }
}
