//! LDP Server - Main entry point

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ldp_common::logging::{init_logging, LogConfig};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tracing::info;

use ldp_server::{
    config::Config,
    db,
    features::{self, FeatureState},
    middleware,
    storage::{config::StorageConfig, Storage},
    worker::{ProcessingWorker, WorkerSettings},
};

/// Application state shared by the root and health handlers
#[derive(Clone)]
struct AppState {
    db: sqlx::PgPool,
    storage: Storage,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging from the environment; the crate-level filter only
    // applies when LOG_FILTER does not override it.
    let mut log_config = LogConfig::from_env().unwrap_or_default();
    if log_config.log_file_prefix == "ldp" {
        log_config.log_file_prefix = "ldp-server".to_string();
    }
    if log_config.filter_directives.is_none() {
        log_config.filter_directives =
            Some("ldp_server=debug,tower_http=debug,sqlx=info".to_string());
    }
    init_logging(&log_config)?;

    info!("Starting LDP Server");

    let config = Arc::new(Config::load()?);
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let db_pool = db::connect(&config.database).await?;
    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let storage_config = StorageConfig::from_env()?;
    let storage = Storage::new(storage_config).await?;
    info!("Storage client initialized");

    let feature_state = FeatureState::new(db_pool.clone(), storage.clone(), config.clone());

    // Stale-job recovery must finish before any worker starts claiming.
    let recovery = feature_state.queue.recover_stale().await?;
    info!(
        reset = recovery.reset,
        failed = recovery.failed,
        "Stale-job recovery completed"
    );

    let _worker_handle = if config.worker.enabled {
        info!(worker_id = %config.worker.worker_id, "Worker is enabled");
        let worker = ProcessingWorker::new(
            db_pool.clone(),
            feature_state.queue.clone(),
            feature_state.catalog.clone(),
            storage.clone(),
            WorkerSettings::from_config(&config),
        );
        Some(worker.spawn())
    } else {
        info!("Worker is disabled (ENABLE_WORKER=false)");
        None
    };

    let state = AppState {
        db: db_pool,
        storage,
    };
    let app = create_router(state, feature_state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState, feature_state: FeatureState, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(health_check))
        .with_state(state)
        .merge(features::router(feature_state))
        // Applied innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Service banner
async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "ldp-server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

/// Health check: probes both adapters and reports per-service status
async fn health_check(State(state): State<AppState>) -> Response {
    let database_up = db::ping(&state.db).await;
    let storage_up = state.storage.probe().await;

    let services = json!({
        "database": if database_up { "up" } else { "down" },
        "object_store": if storage_up { "up" } else { "down" },
    });

    match (database_up, storage_up) {
        (true, true) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "services": services })),
        )
            .into_response(),
        (false, false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "services": services })),
        )
            .into_response(),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "services": services })),
        )
            .into_response(),
    }
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => tracing::error!("Failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(
        "Shutdown signal received; allowing up to {}s for in-flight requests",
        timeout_secs
    );
}
