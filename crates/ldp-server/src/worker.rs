//! Processing worker
//!
//! A long-running loop that claims jobs, streams the referenced object back
//! from storage, parses it line-by-line, and bulk-inserts validated records
//! in throttled batches.
//!
//! The pipeline is pull-driven end to end: the line reader only pulls bytes
//! from the object stream when the loop asks for the next line, and the
//! loop pauses between batch flushes, so back-pressure reaches all the way
//! to the object-store connection. Resident memory is bounded by one batch
//! of records plus the stream buffer, never the whole file.
//!
//! Per-line failures are isolated: a malformed or invalid line lands in the
//! job's bounded error tail and processing continues. A failed batch flush
//! degrades (its rows count as errors) without aborting the job. Only
//! errors that escape the pipeline (a dead object stream, a missing file
//! record) fail the job terminally.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{PgPool, QueryBuilder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::features::files::{FileCatalog, FileStatus};
use crate::features::jobs::{Job, JobProgress, JobQueue, JobResultBody};
use crate::parser::{self, ParseOutcome};
use crate::storage::Storage;

/// Rows per INSERT statement, bounding bind-parameter counts.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Worker tuning derived from process configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub worker_id: String,
    pub batch_size: usize,
    pub write_pause_ms: u64,
    pub poll_interval_ms: u64,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_id: config.worker.worker_id.clone(),
            batch_size: config.jobs.batch_size,
            write_pause_ms: config.jobs.write_pause_ms,
            poll_interval_ms: config.jobs.poll_interval_ms,
        }
    }
}

/// One record waiting in the batch buffer
struct NewParsedRecord {
    file_id: String,
    job_id: String,
    line_number: i64,
    data: Value,
}

pub struct ProcessingWorker {
    pool: PgPool,
    queue: JobQueue,
    catalog: FileCatalog,
    storage: Storage,
    settings: WorkerSettings,
}

impl ProcessingWorker {
    pub fn new(
        pool: PgPool,
        queue: JobQueue,
        catalog: FileCatalog,
        storage: Storage,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            pool,
            queue,
            catalog,
            storage,
            settings,
        }
    }

    /// Start the claim loop in a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(worker_id = %self.settings.worker_id, "Processing worker started");
            self.run().await;
        })
    }

    /// The claim loop: poll for a claimable job, process it, repeat. Backs
    /// off for twice the poll interval after any failure.
    pub async fn run(&self) {
        let poll = Duration::from_millis(self.settings.poll_interval_ms);

        loop {
            match self.queue.claim(&self.settings.worker_id).await {
                Ok(Some(job)) => {
                    if let Err(err) = self.handle_claimed(&job).await {
                        error!(
                            job_id = %job.id,
                            error = %format!("{err:#}"),
                            "Job processing failed"
                        );
                        sleep(2 * poll).await;
                    }
                },
                Ok(None) => sleep(poll).await,
                Err(err) => {
                    error!(error = %err, "Failed to claim job");
                    sleep(2 * poll).await;
                },
            }
        }
    }

    /// Process claimable jobs until the queue is drained. Returns how many
    /// jobs were picked up.
    pub async fn run_pending(&self) -> Result<usize> {
        let mut handled = 0;

        while let Some(job) = self.queue.claim(&self.settings.worker_id).await? {
            if let Err(err) = self.handle_claimed(&job).await {
                error!(job_id = %job.id, error = %format!("{err:#}"), "Job processing failed");
            }
            handled += 1;
        }

        Ok(handled)
    }

    /// Run one claimed job to a terminal state. Errors escaping the
    /// pipeline fail the job before propagating.
    async fn handle_claimed(&self, job: &Job) -> Result<()> {
        info!(
            job_id = %job.id,
            file_id = %job.file_id,
            attempts = job.attempts,
            "Processing job"
        );

        match self.process_job(job).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.queue
                    .fail(&job.id, &format!("{err:#}"))
                    .await
                    .context("failed to record job failure")?;
                Err(err)
            },
        }
    }

    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn process_job(&self, job: &Job) -> Result<()> {
        let file = match self.catalog.get(&job.file_id).await? {
            Some(file) => file,
            None => {
                self.queue
                    .fail(&job.id, &format!("file record '{}' not found", job.file_id))
                    .await?;
                return Ok(());
            },
        };

        let kind = parser::select_parser(&file.content_type);
        let stream = self.storage.get_stream(&file.object_key).await?;
        let mut lines = BufReader::new(stream.into_async_read()).lines();

        let mut progress = JobProgress::default();
        let mut batch: Vec<NewParsedRecord> = Vec::with_capacity(self.settings.batch_size);
        let mut line_number: u64 = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .context("failed reading object stream")?
        {
            line_number += 1;

            match parser::parse_line(kind, &line, line_number) {
                ParseOutcome::Empty => {},
                ParseOutcome::Malformed { error, .. } => {
                    progress.error_count += 1;
                    self.queue
                        .append_error(&job.id, &format!("Line {}: {}", line_number, error))
                        .await?;
                },
                ParseOutcome::Record { data, .. } => {
                    if parser::validate(&data) {
                        batch.push(NewParsedRecord {
                            file_id: job.file_id.clone(),
                            job_id: job.id.clone(),
                            line_number: line_number as i64,
                            data,
                        });

                        if batch.len() >= self.settings.batch_size {
                            self.flush(&job.id, &mut batch, &mut progress).await?;
                        }
                    } else {
                        progress.error_count += 1;
                        self.queue
                            .append_error(
                                &job.id,
                                &format!("Line {}: Invalid data format", line_number),
                            )
                            .await?;
                    }
                },
            }
        }

        if !batch.is_empty() {
            self.flush(&job.id, &mut batch, &mut progress).await?;
        }

        self.catalog
            .set_status(&job.file_id, FileStatus::Processed)
            .await?;

        self.queue
            .complete(
                &job.id,
                &JobResultBody {
                    lines_processed: progress.lines_processed,
                    records_inserted: progress.records_inserted,
                    error_count: progress.error_count,
                    success: true,
                    error: None,
                },
            )
            .await?;

        info!(
            job_id = %job.id,
            lines_processed = progress.lines_processed,
            records_inserted = progress.records_inserted,
            error_count = progress.error_count,
            "Job finished"
        );

        Ok(())
    }

    /// One batch flush: bulk-insert, throttle pause, progress update (which
    /// also renews the claim lease). A failed insert degrades the batch
    /// into `error_count` instead of aborting the job.
    async fn flush(
        &self,
        job_id: &str,
        batch: &mut Vec<NewParsedRecord>,
        progress: &mut JobProgress,
    ) -> Result<()> {
        let count = batch.len() as i64;
        progress.lines_processed += count;

        match self.insert_batch(batch).await {
            Ok(()) => {
                progress.records_inserted += count;
                debug!(job_id = %job_id, rows = count, "Batch flushed");
            },
            Err(err) => {
                warn!(
                    job_id = %job_id,
                    rows = count,
                    error = %format!("{err:#}"),
                    "Batch insert failed; rows counted as errors"
                );
                progress.error_count += count;
            },
        }

        batch.clear();

        sleep(Duration::from_millis(self.settings.write_pause_ms)).await;
        self.queue.update_progress(job_id, *progress).await?;

        Ok(())
    }

    async fn insert_batch(&self, batch: &[NewParsedRecord]) -> Result<()> {
        for chunk in batch.chunks(INSERT_CHUNK_ROWS) {
            let mut query_builder = QueryBuilder::new(
                "INSERT INTO parsed_records (file_id, job_id, line_number, data, processed_at) ",
            );

            query_builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.file_id)
                    .push_bind(&record.job_id)
                    .push_bind(record.line_number)
                    .push_bind(&record.data)
                    .push_bind(chrono::Utc::now());
            });

            query_builder
                .build()
                .execute(&self.pool)
                .await
                .context("Failed to bulk insert parsed records")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Config, CorsConfig, DatabaseConfig, JobConfig, ServerConfig, UploadConfig, WorkerConfig,
    };

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                shutdown_timeout_secs: 30,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/ldp".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_secs: 10,
            },
            upload: UploadConfig {
                max_file_size: 1024,
                allowed_file_types: vec!["text/plain".to_string()],
            },
            jobs: JobConfig {
                batch_size: 500,
                write_pause_ms: 10,
                lock_timeout_ms: 300_000,
                stale_threshold_ms: 600_000,
                poll_interval_ms: 250,
                max_attempts: 3,
            },
            worker: WorkerConfig {
                enabled: true,
                worker_id: "worker-42".to_string(),
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
                allow_credentials: false,
            },
        }
    }

    #[test]
    fn test_settings_from_config() {
        let settings = WorkerSettings::from_config(&test_config());
        assert_eq!(settings.worker_id, "worker-42");
        assert_eq!(settings.batch_size, 500);
        assert_eq!(settings.write_pause_ms, 10);
        assert_eq!(settings.poll_interval_ms, 250);
    }
}
