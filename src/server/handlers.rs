//! HTTP Route Handlers

use crate::connection::{ConnectionHandler, ConnectionLimiter, HandlerSettings};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::protocol::HEALTH_RESPONSE;
use axum::{
    extract::{ws::rejection::WebSocketUpgradeRejection, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Socket sizing applied to every upgrade
#[derive(Debug, Clone, Copy)]
pub struct UpgradeLimits {
    pub write_buffer_size: usize,
    pub max_message_size: usize,
}

/// Shared application state for handlers
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub settings: HandlerSettings,
    pub limits: UpgradeLimits,
    pub limiter: ConnectionLimiter,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Upgrade `/ws` requests and hand the socket to a new connection handler
pub async fn websocket_upgrade(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if *state.shutdown_rx.borrow() {
        debug!("Refusing WebSocket upgrade during shutdown");
        state.metrics.record_connection_error();
        return (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response();
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            warn!(error = %rejection, "Failed to upgrade to WebSocket");
            state.metrics.record_connection_error();
            return rejection.into_response();
        }
    };

    let Some(slot) = state.limiter.try_acquire() else {
        state.metrics.record_connection_error();
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let handler = ConnectionHandler::new(Arc::clone(&state.metrics), state.settings.clone())
        .with_shutdown(state.shutdown_rx.clone());
    debug!(connection_id = %handler.id(), "Accepted WebSocket upgrade");

    let metrics = Arc::clone(&state.metrics);
    upgrade
        .write_buffer_size(state.limits.write_buffer_size)
        .max_message_size(state.limits.max_message_size)
        .on_failed_upgrade(move |e| {
            warn!(error = %e, "WebSocket upgrade failed after handshake");
            metrics.record_connection_error();
        })
        .on_upgrade(move |socket| async move {
            let _slot = slot;
            handler.run(socket).await;
        })
}

/// Health check handler
pub async fn health_check() -> &'static str {
    HEALTH_RESPONSE
}

/// Prometheus text exposition
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, state.metrics.content_type())],
        state.metrics.export_prometheus(),
    )
}

/// JSON view of the registry
pub async fn get_stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
