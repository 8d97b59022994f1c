// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  reqlog — request logger with a bounded CSV store
//
//  HTTP:     axum on tokio
//  Store:    single CSV file, newest N rows, atomic rotation
//  Config:   YAML file + REQLOG_* env overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::Context;
use clap::Parser;
use reqlog_core::ReqLogConfig;
use reqlog_http::{AppState, HttpServer};
use reqlog_observability::RequestRecorder;
use reqlog_store::{LogReader, LogStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "reqlog", version, about = "reqlog — request logger with a bounded CSV store")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "reqlog.yaml")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "reqlog starting");

    // ── Config ──
    let config = if cli.config.exists() {
        info!(path = %cli.config.display(), "Loading config file");
        ReqLogConfig::load(&cli.config)?
    } else {
        info!("No config file found, using defaults");
        ReqLogConfig::default()
    };
    config.validate()?;

    // ── Log store (hard dependency: no storage, no service) ──
    let store = Arc::new(LogStore::new(&config.store));
    store
        .ensure_initialized()
        .context("cannot establish request log storage")?;
    info!(
        path = %store.path().display(),
        max_entries = store.max_entries(),
        "Request log ready"
    );

    // ── Recorder ──
    let (recorder, recorder_task) = RequestRecorder::spawn(Arc::clone(&store), &config.recorder);

    // ── HTTP ──
    let state = AppState {
        reader: LogReader::new(Arc::clone(&store)),
        recorder,
    };
    let served = HttpServer::new(config.server.clone(), state)
        .start(shutdown_signal())
        .await;

    // Flush queued entries even if serving failed.
    recorder_task.shutdown().await;
    served?;

    info!("reqlog stopped");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM (docker stop).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping...");
}
