//! FleetPulse Server — real-time fleet management backbone.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use fleetpulse_core::config::AppConfig;
use fleetpulse_core::error::AppError;
use fleetpulse_core::report::ChangePolicy;
use fleetpulse_core::traits::{ChangeSource, SnapshotSource};
use fleetpulse_realtime::RealtimeEngine;
use fleetpulse_store::{PgChangeSource, SqlSnapshotProvider};

#[tokio::main]
async fn main() {
    let env = std::env::var("FLEETPULSE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting FleetPulse v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = fleetpulse_store::connection::create_pool(&config.database).await?;
    fleetpulse_store::migration::run_migrations(&db_pool).await?;

    // ── Step 2: Snapshot provider and change source ──────────────
    let policy = ChangePolicy::from_config(&config.reports);
    let snapshots: Arc<dyn SnapshotSource> =
        Arc::new(SqlSnapshotProvider::new(db_pool.clone(), policy));
    let changes: Arc<dyn ChangeSource> = Arc::new(PgChangeSource::new(
        db_pool.clone(),
        config.broadcast.change_streams_enabled,
    ));

    // ── Step 3: Real-time engine ─────────────────────────────────
    let realtime = Arc::new(RealtimeEngine::new(&config, snapshots.clone(), changes));
    let background_tasks = realtime.start();

    // ── Step 4: HTTP server ──────────────────────────────────────
    let app_state = fleetpulse_api::AppState {
        config: Arc::new(config.clone()),
        db_pool,
        snapshots,
        realtime: Arc::clone(&realtime),
    };
    let app = fleetpulse_api::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("FleetPulse server listening on {}", addr);

    // ── Step 5: Serve with graceful shutdown ─────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 6: Stop background tasks ────────────────────────────
    realtime.shutdown().await;
    let grace = std::time::Duration::from_secs(config.server.shutdown_grace_seconds);
    for handle in background_tasks {
        let _ = tokio::time::timeout(grace, handle).await;
    }

    tracing::info!("FleetPulse server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
