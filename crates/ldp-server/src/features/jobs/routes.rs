//! Job routes
//!
//! `POST /process/:file_id` enqueues processing of an uploaded file;
//! `GET /jobs/:job_id` is the polling endpoint clients use until the job
//! reaches a terminal state; `GET /jobs` lists jobs for operators.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::api::response::ErrorBody;
use crate::features::FeatureState;

use super::{
    commands::{self, EnqueueJobCommand, EnqueueJobError},
    queries::{self, GetJobError, GetJobQuery, ListJobsError, ListJobsQuery},
    types::Job,
};

pub fn jobs_routes() -> Router<FeatureState> {
    Router::new()
        .route("/process/:file_id", post(process_file))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:job_id", get(get_job))
}

#[tracing::instrument(skip(state))]
async fn process_file(
    State(state): State<FeatureState>,
    Path(file_id): Path<String>,
) -> Result<Response, JobApiError> {
    let job = commands::enqueue::handle(
        &state.queue,
        &state.catalog,
        EnqueueJobCommand { file_id },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "job_id": job.id,
            "file_id": job.file_id,
            "state": job.state,
            "queued_at": job.queued_at,
            "message": "Processing job queued",
        })),
    )
        .into_response())
}

#[tracing::instrument(skip(state))]
async fn get_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<String>,
) -> Result<Response, JobApiError> {
    let job = queries::get_job::handle(&state.queue, GetJobQuery { job_id }).await?;

    Ok((StatusCode::OK, Json(job_body(&job))).into_response())
}

#[tracing::instrument(skip(state))]
async fn list_jobs(
    State(state): State<FeatureState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Response, JobApiError> {
    let response = queries::list_jobs::handle(&state.queue, query).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "jobs": response.jobs.iter().map(job_body).collect::<Vec<_>>(),
            "pagination": response.pagination,
        })),
    )
        .into_response())
}

/// Public JSON shape of one job record.
fn job_body(job: &Job) -> Value {
    json!({
        "job_id": job.id,
        "file_id": job.file_id,
        "state": job.state,
        "attempts": job.attempts,
        "queued_at": job.queued_at,
        "started_at": job.started_at,
        "finished_at": job.finished_at,
        "progress": job.progress,
        "error_count": job.progress.error_count,
        "errors": job.errors,
        "result": job.result,
    })
}

#[derive(Debug)]
enum JobApiError {
    Enqueue(EnqueueJobError),
    Get(GetJobError),
    List(ListJobsError),
}

impl From<EnqueueJobError> for JobApiError {
    fn from(err: EnqueueJobError) -> Self {
        Self::Enqueue(err)
    }
}

impl From<GetJobError> for JobApiError {
    fn from(err: GetJobError) -> Self {
        Self::Get(err)
    }
}

impl From<ListJobsError> for JobApiError {
    fn from(err: ListJobsError) -> Self {
        Self::List(err)
    }
}

impl IntoResponse for JobApiError {
    fn into_response(self) -> Response {
        match self {
            JobApiError::Enqueue(err) => match err {
                EnqueueJobError::InvalidId => {
                    let body = ErrorBody::new(err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                EnqueueJobError::FileNotFound => {
                    let body = ErrorBody::new("File not found");
                    (StatusCode::NOT_FOUND, Json(body)).into_response()
                },
                EnqueueJobError::Database(_) => {
                    tracing::error!("Database error enqueuing job: {}", err);
                    let body = ErrorBody::new("Internal server error");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
            JobApiError::Get(err) => match err {
                GetJobError::InvalidId => {
                    let body = ErrorBody::new(err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                GetJobError::NotFound => {
                    let body = ErrorBody::new("Job not found");
                    (StatusCode::NOT_FOUND, Json(body)).into_response()
                },
                GetJobError::Database(_) => {
                    tracing::error!("Database error fetching job: {}", err);
                    let body = ErrorBody::new("Internal server error");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
            JobApiError::List(err) => match err {
                ListJobsError::InvalidState => {
                    let body = ErrorBody::with_message("Invalid query", err.to_string());
                    (StatusCode::BAD_REQUEST, Json(body)).into_response()
                },
                ListJobsError::Database(_) => {
                    tracing::error!("Database error listing jobs: {}", err);
                    let body = ErrorBody::new("Internal server error");
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::jobs::types::{JobProgress, JobState};
    use chrono::Utc;

    #[test]
    fn test_routes_structure() {
        let router = jobs_routes();
        assert!(format!("{:?}", router).contains("Router"));
    }

    #[test]
    fn test_job_body_shape() {
        let job = Job {
            id: "65f1c2d3a4b5c6d7e8f90a1b".to_string(),
            file_id: "65f1c2d3a4b5c6d7e8f90a1c".to_string(),
            state: JobState::Queued,
            attempts: 0,
            queued_at: Utc::now(),
            started_at: None,
            finished_at: None,
            worker_id: None,
            lock_until: None,
            progress: JobProgress::default(),
            errors: vec![],
            result: None,
            error_message: None,
        };

        let body = job_body(&job);
        assert_eq!(body["job_id"], "65f1c2d3a4b5c6d7e8f90a1b");
        assert_eq!(body["state"], "queued");
        assert_eq!(body["progress"]["lines_processed"], 0);
        assert_eq!(body["error_count"], 0);
        assert!(body["result"].is_null());
        // claim internals stay private
        assert!(body.get("worker_id").is_none());
        assert!(body.get("lock_until").is_none());
    }
}
