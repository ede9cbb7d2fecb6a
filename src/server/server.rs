//! Echo Server

use super::{
    api::EchoApi,
    handlers::{AppState, UpgradeLimits},
};
use crate::connection::{ConnectionLimiter, HandlerSettings};
use crate::{config::Config, metrics::Metrics, Result};
use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

/// HTTP + WebSocket server bound to its listening socket
pub struct EchoServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app_state: AppState,
}

impl EchoServer {
    /// Bind the listener described by `config`.
    ///
    /// Raising the `shutdown_rx` flag stops the server, closes open
    /// sockets and refuses further upgrades.
    pub async fn bind(
        config: &Config,
        metrics: Arc<Metrics>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Self> {
        let bind_addr = config.server.bind_addr();
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind WebSocket server to {}", bind_addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read listener address")?;

        let app_state = AppState {
            metrics,
            settings: HandlerSettings::from(&config.server),
            limits: UpgradeLimits {
                write_buffer_size: config.server.write_buffer_size,
                max_message_size: config.server.max_message_size,
            },
            limiter: ConnectionLimiter::new(config.server.max_connections),
            shutdown_rx,
        };

        Ok(Self {
            listener,
            local_addr,
            app_state,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Router serving this server's routes
    pub fn router(&self) -> Router {
        EchoApi::create_router(self.app_state.clone())
    }

    /// Serve until the shutdown flag is raised
    pub async fn run(self) -> Result<()> {
        let app = self.router();
        let mut shutdown_rx = self.app_state.shutdown_rx.clone();

        info!("WebSocket server listening on {}", self.local_addr);

        let result = axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|down| *down).await;
                info!("WebSocket server received shutdown signal");
            })
            .await;

        if let Err(e) = result {
            error!("WebSocket server error: {}", e);
            return Err(e.into());
        }

        info!("WebSocket server stopped accepting connections");
        Ok(())
    }
}
