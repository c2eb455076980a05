//! List jobs query

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::db::DbError;
use crate::features::jobs::{Job, JobQueue, JobState};
use crate::features::shared::pagination::{PaginationMeta, PaginationParams};

/// Query parameters for listing jobs
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListJobsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Optional state filter: `queued`, `in_progress`, `completed`, `failed`
    pub state: Option<String>,
}

/// Page of job records, newest first
#[derive(Debug, Clone, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub pagination: PaginationMeta,
}

/// Error type for the list jobs query
#[derive(Debug, thiserror::Error)]
pub enum ListJobsError {
    #[error("state must be one of queued, in_progress, completed, failed")]
    InvalidState,
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl Request<Result<ListJobsResponse, ListJobsError>> for ListJobsQuery {}

pub async fn handle(queue: &JobQueue, query: ListJobsQuery) -> Result<ListJobsResponse, ListJobsError> {
    let state = match query.state.as_deref() {
        Some(raw) => {
            // Reject unknown values instead of silently matching nothing.
            let parsed = JobState::from(raw.to_string());
            if parsed.as_str() != raw {
                return Err(ListJobsError::InvalidState);
            }
            Some(parsed)
        },
        None => None,
    };

    let params = PaginationParams::new(query.page, query.per_page);
    let (jobs, total) = queue
        .list(params.per_page(), params.offset(), state.map(|s| s.as_str()))
        .await?;

    Ok(ListJobsResponse {
        pagination: PaginationMeta::new(params.page(), params.per_page(), total),
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserializes_with_state() {
        let query: ListJobsQuery =
            serde_json::from_str(r#"{"page": 1, "state": "in_progress"}"#).unwrap();
        assert_eq!(query.state.as_deref(), Some("in_progress"));
    }
}
