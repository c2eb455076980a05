//! Job queue types
//!
//! Job state forms a small DAG:
//!
//! ```text
//! queued ──► in_progress ──► completed
//!    ▲            │  └─────► failed
//!    └────────────┘  (stale-recovery reset)
//! ```
//!
//! `completed` and `failed` are terminal. A direct `queued` → `failed`
//! transition exists only for jobs that exhausted their attempts during a
//! stale-recovery pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of per-line error entries retained on a job. Older
/// entries are evicted first.
pub const ERROR_TAIL_CAP: usize = 100;

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    /// Whether no further transitions are allowed out of this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "queued" => JobState::Queued,
            "in_progress" => JobState::InProgress,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            _ => JobState::Queued,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress counters for one job
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobProgress {
    /// Lines that produced a batched record
    pub lines_processed: i64,
    /// Records actually written by bulk inserts
    pub records_inserted: i64,
    /// Parse/validation failures plus rows lost to failed flushes
    pub error_count: i64,
}

/// One retained per-line error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobErrorEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Terminal result stored on a completed or failed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResultBody {
    pub lines_processed: i64,
    pub records_inserted: i64,
    pub error_count: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One unit of deferred processing against a file record
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub file_id: String,
    pub state: JobState,
    pub attempts: i32,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub lock_until: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    pub errors: Vec<JobErrorEntry>,
    pub result: Option<Value>,
    pub error_message: Option<String>,
}

/// Raw database row for a job record
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JobRow {
    pub id: String,
    pub file_id: String,
    pub state: String,
    pub attempts: i32,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker_id: Option<String>,
    pub lock_until: Option<DateTime<Utc>>,
    pub lines_processed: i64,
    pub records_inserted: i64,
    pub error_count: i64,
    pub errors: Value,
    pub result: Option<Value>,
    pub error_message: Option<String>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let errors: Vec<JobErrorEntry> = serde_json::from_value(row.errors).unwrap_or_default();

        Job {
            id: row.id,
            file_id: row.file_id,
            state: JobState::from(row.state),
            attempts: row.attempts,
            queued_at: row.queued_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            worker_id: row.worker_id,
            lock_until: row.lock_until,
            progress: JobProgress {
                lines_processed: row.lines_processed,
                records_inserted: row.records_inserted,
                error_count: row.error_count,
            },
            errors,
            result: row.result,
            error_message: row.error_message,
        }
    }
}
