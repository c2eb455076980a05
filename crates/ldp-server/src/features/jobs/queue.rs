//! Durable job queue over PostgreSQL
//!
//! Claiming is a single atomic statement conditioned on the job still being
//! claimable, so no two workers can move the same job out of `queued`. The
//! inner `SELECT … FOR UPDATE SKIP LOCKED` keeps concurrent claimers from
//! blocking each other; strict `(queued_at, id)` ordering makes dispatch
//! FIFO and fair across workers.
//!
//! A claim also reclaims `in_progress` jobs whose lock lease has expired
//! (while attempts remain), which is what lets a crashed worker's job flow
//! back into rotation without waiting for the next process restart. The
//! startup [`JobQueue::recover_stale`] pass handles the rest: resetting
//! stale jobs with attempts left and terminally failing the ones without.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};

use crate::config::JobConfig;
use crate::db::DbResult;
use ldp_common::ObjectId;

use super::types::{Job, JobProgress, JobResultBody, JobRow};

const JOB_COLUMNS: &str = "id, file_id, state, attempts, queued_at, started_at, finished_at, \
     worker_id, lock_until, lines_processed, records_inserted, error_count, \
     errors, result, error_message";

/// Tuning for claim leases and stale recovery
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    /// Lease duration granted on claim and extended on every progress
    /// update.
    pub lock_timeout_ms: i64,
    /// Age of `started_at` past which an in-progress job is considered
    /// stale regardless of its lock. Must exceed `lock_timeout_ms`.
    pub stale_threshold_ms: i64,
    /// Claim attempts before a stale job is failed terminally.
    pub max_attempts: i32,
}

impl From<&JobConfig> for JobQueueConfig {
    fn from(config: &JobConfig) -> Self {
        Self {
            lock_timeout_ms: config.lock_timeout_ms,
            stale_threshold_ms: config.stale_threshold_ms,
            max_attempts: config.max_attempts,
        }
    }
}

/// Counts from one stale-recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Jobs returned to `queued`
    pub reset: u64,
    /// Jobs failed for exhausting their attempts
    pub failed: u64,
}

#[derive(Clone)]
pub struct JobQueue {
    pool: PgPool,
    config: JobQueueConfig,
}

impl JobQueue {
    pub fn new(pool: PgPool, config: JobQueueConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &JobQueueConfig {
        &self.config
    }

    /// Insert a new `queued` job with zero attempts and empty progress.
    pub async fn create(&self, file_id: &str) -> DbResult<Job> {
        let id = ObjectId::generate();

        let sql = format!(
            "INSERT INTO jobs (id, file_id, state, attempts, errors) \
             VALUES ($1, $2, 'queued', 0, '[]'::jsonb) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id.as_str())
            .bind(file_id)
            .fetch_one(&self.pool)
            .await?;

        debug!(job_id = %id, file_id = %file_id, "Job queued");

        Ok(row.into())
    }

    /// Atomically claim the oldest claimable job for a worker.
    ///
    /// Claimable means `queued`, or `in_progress` with an expired lock and
    /// attempts remaining. The claim sets the worker id, stamps
    /// `started_at`, grants a fresh lock lease, and increments the attempt
    /// counter, all in one statement.
    #[instrument(skip(self))]
    pub async fn claim(&self, worker_id: &str) -> DbResult<Option<Job>> {
        let sql = format!(
            "UPDATE jobs \
             SET state = 'in_progress', \
                 worker_id = $1, \
                 started_at = now(), \
                 lock_until = now() + ($2::bigint * interval '1 millisecond'), \
                 attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE state = 'queued' \
                    OR (state = 'in_progress' AND lock_until < now() AND attempts < $3) \
                 ORDER BY queued_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {JOB_COLUMNS}"
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(worker_id)
            .bind(self.config.lock_timeout_ms)
            .bind(self.config.max_attempts)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = &row {
            debug!(job_id = %row.id, attempts = row.attempts, "Job claimed");
        }

        Ok(row.map(Into::into))
    }

    /// Write the current progress snapshot and renew the lock lease.
    /// Progress only lands while the job is still `in_progress`.
    pub async fn update_progress(&self, job_id: &str, progress: JobProgress) -> DbResult<()> {
        sqlx::query(
            "UPDATE jobs \
             SET lines_processed = $2, \
                 records_inserted = $3, \
                 error_count = $4, \
                 lock_until = now() + ($5::bigint * interval '1 millisecond') \
             WHERE id = $1 AND state = 'in_progress'",
        )
        .bind(job_id)
        .bind(progress.lines_processed)
        .bind(progress.records_inserted)
        .bind(progress.error_count)
        .bind(self.config.lock_timeout_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Terminal transition to `completed` with the final result.
    pub async fn complete(&self, job_id: &str, result: &JobResultBody) -> DbResult<()> {
        let payload = serde_json::to_value(result).unwrap_or_default();

        let updated = sqlx::query(
            "UPDATE jobs \
             SET state = 'completed', \
                 finished_at = now(), \
                 lines_processed = $2, \
                 records_inserted = $3, \
                 error_count = $4, \
                 result = $5 \
             WHERE id = $1 AND state = 'in_progress'",
        )
        .bind(job_id)
        .bind(result.lines_processed)
        .bind(result.records_inserted)
        .bind(result.error_count)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            self.warn_rejected_transition(job_id, "complete").await?;
        } else {
            info!(
                job_id = %job_id,
                records_inserted = result.records_inserted,
                error_count = result.error_count,
                "Job completed"
            );
        }

        Ok(())
    }

    /// Terminal transition to `failed` with the captured error.
    pub async fn fail(&self, job_id: &str, error: &str) -> DbResult<()> {
        let result = serde_json::json!({ "success": false, "error": error });

        let updated = sqlx::query(
            "UPDATE jobs \
             SET state = 'failed', \
                 finished_at = now(), \
                 error_message = $2, \
                 result = $3 \
             WHERE id = $1 AND state IN ('queued', 'in_progress')",
        )
        .bind(job_id)
        .bind(error)
        .bind(&result)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            self.warn_rejected_transition(job_id, "fail").await?;
        } else {
            warn!(job_id = %job_id, error = %error, "Job failed");
        }

        Ok(())
    }

    /// Diagnose a terminal transition whose guarded UPDATE matched no row:
    /// terminal states admit no further transitions, so a late `complete`
    /// or `fail` (a stale worker, a recovered job) is ignored, not applied.
    async fn warn_rejected_transition(&self, job_id: &str, operation: &str) -> DbResult<()> {
        match self.get(job_id).await? {
            Some(job) if job.state.is_terminal() => {
                warn!(
                    job_id = %job_id,
                    state = %job.state,
                    "{operation}() ignored; job already terminal"
                );
            },
            Some(job) => {
                warn!(
                    job_id = %job_id,
                    state = %job.state,
                    "{operation}() ignored; job not claimable for this transition"
                );
            },
            None => {
                warn!(job_id = %job_id, "{operation}() ignored; job not found");
            },
        }

        Ok(())
    }

    /// Push one entry onto the bounded error tail and bump the error
    /// counter. When the tail is full the oldest entries are evicted.
    pub async fn append_error(&self, job_id: &str, message: &str) -> DbResult<()> {
        let entry = serde_json::json!([{
            "message": message,
            "timestamp": Utc::now(),
        }]);

        sqlx::query(
            "UPDATE jobs \
             SET errors = ( \
                     SELECT COALESCE(jsonb_agg(entry ORDER BY ord), '[]'::jsonb) \
                     FROM ( \
                         SELECT entry, ord \
                         FROM jsonb_array_elements(errors || $2::jsonb) \
                              WITH ORDINALITY AS t(entry, ord) \
                         ORDER BY ord DESC \
                         LIMIT $3 \
                     ) tail \
                 ), \
                 error_count = error_count + 1 \
             WHERE id = $1 AND state = 'in_progress'",
        )
        .bind(job_id)
        .bind(&entry)
        .bind(super::types::ERROR_TAIL_CAP as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reset or fail stale in-progress jobs. Invoked once at process
    /// startup, before any worker claims.
    ///
    /// A job is stale when its lock has expired or it started longer than
    /// the stale threshold ago. Stale jobs with attempts left return to
    /// `queued`; the rest fail terminally.
    #[instrument(skip(self))]
    pub async fn recover_stale(&self) -> DbResult<RecoveryOutcome> {
        let reset = sqlx::query(
            "UPDATE jobs \
             SET state = 'queued', worker_id = NULL, lock_until = NULL, started_at = NULL \
             WHERE state = 'in_progress' \
               AND (lock_until < now() \
                    OR started_at < now() - ($1::bigint * interval '1 millisecond')) \
               AND attempts < $2",
        )
        .bind(self.config.stale_threshold_ms)
        .bind(self.config.max_attempts)
        .execute(&self.pool)
        .await?
        .rows_affected();

        let failed = sqlx::query(
            "UPDATE jobs \
             SET state = 'failed', \
                 finished_at = now(), \
                 worker_id = NULL, \
                 lock_until = NULL, \
                 error_message = 'exceeded maximum attempts and became stale', \
                 result = jsonb_build_object( \
                     'success', false, \
                     'error', 'exceeded maximum attempts and became stale') \
             WHERE state = 'in_progress' \
               AND (lock_until < now() \
                    OR started_at < now() - ($1::bigint * interval '1 millisecond')) \
               AND attempts >= $2",
        )
        .bind(self.config.stale_threshold_ms)
        .bind(self.config.max_attempts)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if reset > 0 || failed > 0 {
            info!(reset, failed, "Stale-job recovery pass finished");
        }

        Ok(RecoveryOutcome { reset, failed })
    }

    pub async fn get(&self, job_id: &str) -> DbResult<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Paginated listing, newest first, optionally filtered by state.
    /// Returns the page of jobs and the total matching count.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        state: Option<&str>,
    ) -> DbResult<(Vec<Job>, i64)> {
        let (rows, total) = match state {
            Some(state) => {
                let sql = format!(
                    "SELECT {JOB_COLUMNS} FROM jobs WHERE state = $1 \
                     ORDER BY queued_at DESC LIMIT $2 OFFSET $3"
                );
                let rows = sqlx::query_as::<_, JobRow>(&sql)
                    .bind(state)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;

                let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE state = $1")
                    .bind(state)
                    .fetch_one(&self.pool)
                    .await?;

                (rows, total.0)
            },
            None => {
                let sql = format!(
                    "SELECT {JOB_COLUMNS} FROM jobs ORDER BY queued_at DESC LIMIT $1 OFFSET $2"
                );
                let rows = sqlx::query_as::<_, JobRow>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;

                let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
                    .fetch_one(&self.pool)
                    .await?;

                (rows, total.0)
            },
        };

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }
}
