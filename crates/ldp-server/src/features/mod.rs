//! Feature modules implementing the LDP API
//!
//! Each feature is a vertical slice with its own commands, queries, and
//! routes:
//!
//! - **files**: file catalog and the streaming upload pipeline
//! - **jobs**: durable processing job queue and its read endpoints
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate; route handlers invoke the slice `handle` functions directly.

pub mod files;
pub mod jobs;
pub mod shared;

use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::features::files::FileCatalog;
use crate::features::jobs::JobQueue;
use crate::storage::Storage;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool
    pub db: sqlx::PgPool,
    /// Object-store adapter
    pub storage: Storage,
    /// File catalog (owns all file-record writes)
    pub catalog: FileCatalog,
    /// Job queue (owns all job-record writes)
    pub queue: JobQueue,
    /// Process configuration
    pub config: Arc<Config>,
}

impl FeatureState {
    pub fn new(db: sqlx::PgPool, storage: Storage, config: Arc<Config>) -> Self {
        let catalog = FileCatalog::new(db.clone());
        let queue = JobQueue::new(db.clone(), (&config.jobs).into());
        Self {
            db,
            storage,
            catalog,
            queue,
            config,
        }
    }
}

/// Creates the API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router {
    Router::new()
        .merge(files::routes::files_routes())
        .merge(jobs::routes::jobs_routes())
        .with_state(state)
}
