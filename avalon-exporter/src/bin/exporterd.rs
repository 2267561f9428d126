//! Exporter daemon.
//!
//! Starts the poller loop and the HTTP server, then waits for SIGINT or
//! SIGTERM. Shutdown cancels the token, drains the HTTP server gracefully,
//! and gives the poller loop a bounded window to finish its cycle.

use std::env;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use avalon_exporter::api::{SharedState, server};
use avalon_exporter::config::{COMBINED_CMD, Config};
use avalon_exporter::scheduler;
use avalon_exporter::store::SnapshotStore;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    let store = Arc::new(SnapshotStore::new());
    let shutdown = CancellationToken::new();

    info!(
        version = avalon_exporter::VERSION,
        port = config.exporter_port,
        interval_secs = config.update_interval.as_secs_f64(),
        combined_cmd = COMBINED_CMD,
        export_chip_metrics = config.export_chip_metrics,
        "Avalon exporter starting"
    );
    for target in &config.targets {
        info!(target = %target, "Polling miner");
    }

    let scheduler_handle = tokio::spawn(scheduler::task(
        store.clone(),
        config.clone(),
        shutdown.clone(),
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    let state = SharedState {
        store,
        config: Arc::new(config.clone()),
        shutdown: shutdown.clone(),
    };
    server::run(state, shutdown.clone()).await?;

    // The server has drained; give the poller loop a bounded window to
    // finish the cycle it may still be in.
    info!("Waiting for poller loop to finish");
    let drain = config.update_interval * 2;
    if tokio::time::timeout(drain, scheduler_handle).await.is_err() {
        warn!("Poller loop did not finish in time");
    }

    info!("Exporter shutdown complete");
    Ok(())
}

/// Log filter from LOG_LEVEL, falling back to RUST_LOG, defaulting to info.
fn init_tracing() {
    let filter = env::var("LOG_LEVEL")
        .map(|level| level.to_lowercase())
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}
