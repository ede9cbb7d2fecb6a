//! HTTP Routes

use super::handlers::*;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Echo server router
pub struct EchoApi;

impl EchoApi {
    /// Create the router: WebSocket endpoint, health, and metrics
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/ws", get(websocket_upgrade))
            .route("/", get(health_check))
            .route("/health", get(health_check))
            .route("/metrics", get(prometheus_metrics))
            .route("/stats", get(get_stats))
            .with_state(state)
            // any origin may open a socket
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionLimiter, HandlerSettings};
    use crate::metrics::Metrics;
    use crate::protocol::HEALTH_RESPONSE;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::watch;
    use tower::ServiceExt;

    fn create_test_state(max_connections: Option<usize>) -> AppState {
        create_test_state_with_shutdown(max_connections, watch::channel(false).1)
    }

    fn create_test_state_with_shutdown(
        max_connections: Option<usize>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> AppState {
        AppState {
            metrics: Arc::new(Metrics::new().unwrap()),
            settings: HandlerSettings::default(),
            limits: UpgradeLimits {
                write_buffer_size: 8192,
                max_message_size: 64 << 20,
            },
            limiter: ConnectionLimiter::new(max_connections),
            shutdown_rx,
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        for uri in ["/", "/health"] {
            let app = EchoApi::create_router(create_test_state(None));
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();

            let response = app.oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_string(response).await, HEALTH_RESPONSE);
        }
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let state = create_test_state(None);
        state.metrics.record_message_received();
        let app = EchoApi::create_router(state);

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = body_string(response).await;
        assert!(body.contains("websocket_messages_received_total 1"));
        assert!(body.contains("websocket_server_response_time_seconds_count 0"));
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let state = create_test_state(None);
        state.metrics.record_message_error();
        let app = EchoApi::create_router(state);

        let request = Request::builder().uri("/stats").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["message_errors"], 1);
        assert_eq!(json["active_connections"], 0);
        assert_eq!(json["response_time"]["buckets"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_plain_request_to_ws_counts_connection_error() {
        let state = create_test_state(None);
        let metrics = Arc::clone(&state.metrics);
        let app = EchoApi::create_router(state);

        let request = Request::builder().uri("/ws").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(metrics.connection_errors(), 1);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_upgrade_refused_after_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = create_test_state_with_shutdown(None, shutdown_rx);
        let metrics = Arc::clone(&state.metrics);
        let app = EchoApi::create_router(state);
        shutdown_tx.send_replace(true);

        let request = Request::builder()
            .uri("/ws")
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(metrics.connection_errors(), 1);
        assert_eq!(metrics.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = EchoApi::create_router(create_test_state(None));
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
