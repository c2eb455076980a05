//! Jobs feature: the durable processing job queue
//!
//! Every mutation of job records goes through [`queue::JobQueue`], so the
//! state-machine invariants are enforced in exactly one place.

pub mod commands;
pub mod queries;
pub mod queue;
pub mod routes;
pub mod types;

pub use queue::{JobQueue, JobQueueConfig, RecoveryOutcome};
pub use types::{Job, JobErrorEntry, JobProgress, JobResultBody, JobState};
