//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/ldp";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-file upload size limit: 5 GiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Default allowed upload MIME types.
pub const DEFAULT_ALLOWED_FILE_TYPES: &str = "text/plain,application/json,text/csv";

/// Default number of parsed records per bulk-insert batch.
pub const DEFAULT_JOB_BATCH_SIZE: usize = 1000;

/// Default pause after each batch flush, in milliseconds.
pub const DEFAULT_JOB_WRITE_PAUSE_MS: u64 = 50;

/// Default job lock lease, in milliseconds (5 minutes).
pub const DEFAULT_JOB_LOCK_TIMEOUT_MS: i64 = 300_000;

/// Default stale-job threshold, in milliseconds (10 minutes).
pub const DEFAULT_JOB_STALE_THRESHOLD_MS: i64 = 600_000;

/// Default worker poll interval, in milliseconds.
pub const DEFAULT_WORKER_POLL_INTERVAL_MS: u64 = 1000;

/// Default maximum processing attempts per job.
pub const DEFAULT_MAX_JOB_ATTEMPTS: i32 = 3;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
    pub jobs: JobConfig,
    pub worker: WorkerConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Upload admission policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Per-file byte limit enforced while streaming.
    pub max_file_size: u64,
    /// MIME types accepted by the ingest pipeline.
    pub allowed_file_types: Vec<String>,
}

/// Job queue and processing tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub batch_size: usize,
    pub write_pause_ms: u64,
    pub lock_timeout_ms: i64,
    pub stale_threshold_ms: i64,
    pub poll_interval_ms: u64,
    pub max_attempts: i32,
}

/// Worker task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub enabled: bool,
    pub worker_id: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_parsed("PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_parsed(
                    "SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parsed(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_parsed(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_parsed(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            upload: UploadConfig {
                max_file_size: env_parsed("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
                allowed_file_types: std::env::var("ALLOWED_FILE_TYPES")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_FILE_TYPES.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            jobs: JobConfig {
                batch_size: env_parsed("JOB_BATCH_SIZE", DEFAULT_JOB_BATCH_SIZE),
                write_pause_ms: env_parsed("JOB_WRITE_PAUSE_MS", DEFAULT_JOB_WRITE_PAUSE_MS),
                lock_timeout_ms: env_parsed("JOB_LOCK_TIMEOUT_MS", DEFAULT_JOB_LOCK_TIMEOUT_MS),
                stale_threshold_ms: env_parsed(
                    "JOB_STALE_THRESHOLD_MS",
                    DEFAULT_JOB_STALE_THRESHOLD_MS,
                ),
                poll_interval_ms: env_parsed(
                    "WORKER_POLL_INTERVAL_MS",
                    DEFAULT_WORKER_POLL_INTERVAL_MS,
                ),
                max_attempts: env_parsed("MAX_JOB_ATTEMPTS", DEFAULT_MAX_JOB_ATTEMPTS),
            },
            worker: WorkerConfig {
                enabled: env_parsed("ENABLE_WORKER", true),
                worker_id: std::env::var("WORKER_ID")
                    .unwrap_or_else(|_| format!("worker-{}", std::process::id())),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: env_parsed("CORS_ALLOW_CREDENTIALS", false),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!("DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS");
        }

        if self.upload.max_file_size == 0 {
            anyhow::bail!("MAX_FILE_SIZE must be greater than 0");
        }

        if self.upload.allowed_file_types.is_empty() {
            anyhow::bail!("ALLOWED_FILE_TYPES must list at least one MIME type");
        }

        if self.jobs.batch_size == 0 {
            anyhow::bail!("JOB_BATCH_SIZE must be greater than 0");
        }

        if self.jobs.max_attempts < 1 {
            anyhow::bail!("MAX_JOB_ATTEMPTS must be at least 1");
        }

        // The startup-recovery race is bounded only while the stale
        // threshold exceeds the lock lease.
        if self.jobs.stale_threshold_ms <= self.jobs.lock_timeout_ms {
            anyhow::bail!("JOB_STALE_THRESHOLD_MS must be greater than JOB_LOCK_TIMEOUT_MS");
        }

        if self.worker.worker_id.trim().is_empty() {
            anyhow::bail!("WORKER_ID cannot be empty");
        }

        Ok(())
    }
}

/// Read an environment variable and parse it, falling back to a default on
/// absence or parse failure.
fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
