//! The scheduler runs one poll cycle across all miners at a fixed interval.
//!
//! Each cycle fans out one task per target and waits for the stragglers up
//! to a grace deadline (twice the per-call timeout) before moving on. A
//! shutdown request stops the loop between cycles; pollers already in
//! flight run to completion or their own timeout.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::poller::poll_target;
use crate::store::SnapshotStore;

pub async fn task(store: Arc<SnapshotStore>, config: Config, running: CancellationToken) {
    info!(
        targets = config.targets.len(),
        interval_secs = config.update_interval.as_secs_f64(),
        "Poller loop started"
    );

    while !running.is_cancelled() {
        store.beat();
        let cycle_start = Instant::now();

        let mut handles = Vec::with_capacity(config.targets.len());
        for target in &config.targets {
            if running.is_cancelled() {
                break;
            }
            let store = store.clone();
            let target = target.clone();
            let timeout = config.miner_timeout;
            let per_chip = config.export_chip_metrics;
            handles.push(tokio::spawn(async move {
                poll_target(&store, &target, timeout, per_chip).await;
            }));
        }

        // Wait for the whole cycle, bounded. Pollers that outlive the grace
        // deadline keep running detached and publish whenever they finish.
        let waited = tokio::time::timeout(config.cycle_grace(), join_all(handles)).await;
        match waited {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        warn!(error = %err, "Poller task panicked");
                    }
                }
            }
            Err(_) => {
                warn!(grace = ?config.cycle_grace(), "Poll cycle exceeded grace deadline");
            }
        }

        debug!(
            targets = config.targets.len(),
            duration_ms = cycle_start.elapsed().as_millis() as u64,
            "Completed poll cycle"
        );

        tokio::select! {
            _ = tokio::time::sleep(config.update_interval) => {}
            _ = running.cancelled() => break,
        }
    }

    trace!("Poller loop stopped (shutdown requested)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned replies forever on an ephemeral port.
    async fn fake_miner(addr: &str) -> u16 {
        let listener = TcpListener::bind((addr, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut cmd = Vec::new();
                    socket.read_to_end(&mut cmd).await.unwrap();
                    socket
                        .write_all(b"CMD=summary|SUMMARY,Elapsed=10,Accepted=1|")
                        .await
                        .unwrap();
                });
            }
        });
        port
    }

    #[tokio::test]
    async fn cycle_polls_every_target_and_beats() {
        // Distinct loopback addresses: the store keys entries by host.
        let port_a = fake_miner("127.0.0.1").await;
        let port_b = fake_miner("127.0.0.2").await;

        let config = Config {
            targets: vec![
                Target::new("127.0.0.1", port_a),
                Target::new("127.0.0.2", port_b),
            ],
            update_interval: Duration::from_secs(60),
            miner_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let store = Arc::new(SnapshotStore::new());
        let running = CancellationToken::new();

        let handle = tokio::spawn(task(store.clone(), config, running.clone()));

        // Give the first cycle time to complete, then shut down.
        tokio::time::sleep(Duration::from_millis(500)).await;
        running.cancel();
        handle.await.unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.heartbeat.is_some());
        assert_eq!(snapshot.targets["127.0.0.1"].up, Some(true));
        assert_eq!(snapshot.targets["127.0.0.2"].up, Some(true));
    }

    #[tokio::test]
    async fn shutdown_between_cycles_is_prompt() {
        let config = Config {
            targets: vec![],
            update_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let store = Arc::new(SnapshotStore::new());
        let running = CancellationToken::new();

        let handle = tokio::spawn(task(store, config, running.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        running.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop without waiting out the interval")
            .unwrap();
    }
}
