//! verdict-server - HTTP front end for the analysis orchestrator.
//!
//! Loads the configuration, recovers jobs left unfinished by a previous
//! process, starts the stuck-job supervisor and serves the JSON API until
//! interrupted.

mod error;
mod logging;
mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::signal;
use tokio::sync::broadcast;

use verdict::{
    load_config, AnalysisEvent, AnalysisEventBroadcaster, Config, Database, JobStore,
    JobSupervisor, Orchestrator, SimulatedDetector, SqliteJobStore,
};

use state::AppState;

/// Command-line arguments for verdict-server
#[derive(Parser, Debug)]
#[command(name = "verdict-server")]
#[command(about = "Deepfake and synthetic media analysis orchestrator")]
#[command(version)]
struct Args {
    /// Path to a JSON config file (built-in defaults when omitted)
    #[arg(short, long, env = "VERDICT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overrides server.host
    #[arg(long, env = "VERDICT_HOST")]
    host: Option<String>,

    /// Port to listen on, overrides server.port
    #[arg(short, long, env = "VERDICT_PORT")]
    port: Option<u16>,

    /// SQLite database file, overrides database_path
    #[arg(long, env = "VERDICT_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    logging::init(&config.logging);
    info!("Starting verdict-server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = args
        .database
        .clone()
        .or_else(|| config.database_path())
        .context("Could not determine a database path; pass --database")?;
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    info!("Using database {}", db_path.display());
    let store: Arc<dyn JobStore> = Arc::new(SqliteJobStore::new(db));

    let events = AnalysisEventBroadcaster::default();
    let supervisor = JobSupervisor::new(
        store.clone(),
        events.clone(),
        Duration::from_secs(config.supervisor.stuck_job_timeout_secs),
        Duration::from_secs(config.supervisor.interval_secs),
    );
    supervisor
        .fail_interrupted()
        .context("Failed to recover interrupted jobs")?;
    let supervisor_task = supervisor.start();

    let detector = Arc::new(SimulatedDetector::new(Duration::from_millis(
        config.detector.simulated_latency_ms,
    )));
    let registry = config.registry();
    info!(
        "Registered {} model(s): {}",
        registry.len(),
        registry
            .models()
            .iter()
            .map(|m| format!("{} {}", m.name, m.version))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let orchestrator = Orchestrator::with_events(
        registry,
        store,
        detector,
        config.orchestrator_settings(),
        events.clone(),
    );

    tokio::spawn(log_events(events.subscribe()));

    let app = routes::create_router(AppState::new(orchestrator));

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    supervisor.stop();
    if let Err(e) = supervisor_task.await {
        log::warn!("Job supervisor task ended abnormally: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Mirrors orchestrator events into the debug log.
async fn log_events(mut rx: broadcast::Receiver<AnalysisEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => log::debug!("event: {}", json),
                Err(e) => log::warn!("Failed to serialize event for job {}: {}", event.job_id(), e),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::warn!("Event log lagged, skipped {} event(s)", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
