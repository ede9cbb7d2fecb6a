//! Graceful Shutdown Handling
//!
//! This module provides utilities for handling graceful shutdown of the echo server.
//! It supports SIGTERM and SIGINT signals and waits for open sockets to close.

use crate::metrics::Metrics;
use crate::Result;
use std::time::Duration;
use tokio::time::Instant;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// Raised once; receivers that subscribe later still observe it
    shutdown_tx: watch::Sender<bool>,
    /// How long to wait for open connections to drain
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            shutdown_tx,
            timeout,
        }
    }

    /// Receiver for the shutdown flag
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Raise the shutdown flag
    pub fn trigger(&self) {
        if self.shutdown_tx.send_replace(true) {
            debug!("Shutdown already triggered");
        } else {
            debug!(
                "Shutdown signal sent to {} receivers",
                self.shutdown_tx.receiver_count()
            );
        }
    }

    /// Start listening for shutdown signals (SIGTERM, SIGINT)
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();

        Ok(())
    }

    /// Wait for `active_connections` to drain; returns whether it reached zero
    pub async fn wait_for_connections(&self, metrics: &Metrics) -> bool {
        let start_time = Instant::now();

        let mut last_count = metrics.active_connections();
        info!(
            "Waiting for {} active connections to close (timeout: {:?})",
            last_count, self.timeout
        );

        while last_count > 0 && start_time.elapsed() < self.timeout {
            tokio::time::sleep(Duration::from_millis(50)).await;

            let current_count = metrics.active_connections();
            if current_count != last_count {
                debug!("Active connections: {} -> {}", last_count, current_count);
                last_count = current_count;
            }
        }

        let elapsed = start_time.elapsed();
        if last_count <= 0 {
            info!("All connections closed gracefully in {:?}", elapsed);
            true
        } else {
            warn!(
                "Shutdown timeout reached after {:?} with {} connections still active",
                elapsed, last_count
            );
            false
        }
    }
}
