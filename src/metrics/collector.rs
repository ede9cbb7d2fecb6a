//! Metrics Collector

use super::{BucketCount, HistogramSnapshot, MetricsSnapshot};
use anyhow::Context;
use prometheus::core::Metric;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::time::Duration;
use tracing::{debug, error};

pub const MESSAGES_RECEIVED: &str = "websocket_messages_received_total";
pub const MESSAGES_SENT: &str = "websocket_messages_sent_total";
pub const ACTIVE_CONNECTIONS: &str = "websocket_active_connections";
pub const CONNECTION_ERRORS: &str = "websocket_connection_errors_total";
pub const MESSAGE_ERRORS: &str = "websocket_message_errors_total";
pub const RESPONSE_TIME: &str = "websocket_server_response_time_seconds";

/// Fixed response-time bucket boundaries in seconds
pub const RESPONSE_TIME_BUCKETS: [f64; 7] = [0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Connection and message counters shared by every connection handler.
///
/// Each instance owns its own Prometheus registry, so tests can build
/// isolated collectors. All updates are lock-free atomics inside the
/// Prometheus metric types.
pub struct Metrics {
    prometheus_registry: Registry,

    messages_received: IntCounter,
    messages_sent: IntCounter,
    active_connections: IntGauge,
    connection_errors: IntCounter,
    message_errors: IntCounter,
    response_time: Histogram,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> crate::Result<Self> {
        let prometheus_registry = Registry::new();

        let messages_received =
            IntCounter::new(MESSAGES_RECEIVED, "Total number of messages received")
                .context("Failed to create messages_received counter")?;

        let messages_sent = IntCounter::new(MESSAGES_SENT, "Total number of messages sent")
            .context("Failed to create messages_sent counter")?;

        let active_connections =
            IntGauge::new(ACTIVE_CONNECTIONS, "Number of active WebSocket connections")
                .context("Failed to create active_connections gauge")?;

        let connection_errors =
            IntCounter::new(CONNECTION_ERRORS, "Total number of connection errors")
                .context("Failed to create connection_errors counter")?;

        let message_errors =
            IntCounter::new(MESSAGE_ERRORS, "Total number of message processing errors")
                .context("Failed to create message_errors counter")?;

        let response_time = Histogram::with_opts(
            HistogramOpts::new(
                RESPONSE_TIME,
                "Histogram of server response times for WebSocket messages",
            )
            .buckets(RESPONSE_TIME_BUCKETS.to_vec()),
        )
        .context("Failed to create response_time histogram")?;

        prometheus_registry
            .register(Box::new(messages_received.clone()))
            .context("Failed to register messages_received")?;
        prometheus_registry
            .register(Box::new(messages_sent.clone()))
            .context("Failed to register messages_sent")?;
        prometheus_registry
            .register(Box::new(active_connections.clone()))
            .context("Failed to register active_connections")?;
        prometheus_registry
            .register(Box::new(connection_errors.clone()))
            .context("Failed to register connection_errors")?;
        prometheus_registry
            .register(Box::new(message_errors.clone()))
            .context("Failed to register message_errors")?;
        prometheus_registry
            .register(Box::new(response_time.clone()))
            .context("Failed to register response_time")?;

        Ok(Self {
            prometheus_registry,
            messages_received,
            messages_sent,
            active_connections,
            connection_errors,
            message_errors,
            response_time,
        })
    }

    /// Also export CPU, memory and file descriptor usage of this process
    #[cfg(target_os = "linux")]
    pub fn register_process_metrics(&self) -> crate::Result<()> {
        let collector = prometheus::process_collector::ProcessCollector::for_self();
        self.prometheus_registry
            .register(Box::new(collector))
            .context("Failed to register process collector")?;
        debug!("Registered process metrics collector");
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    pub fn register_process_metrics(&self) -> crate::Result<()> {
        debug!("Process metrics are only available on Linux");
        Ok(())
    }

    pub fn connection_opened(&self) {
        self.active_connections.inc();
    }

    pub fn connection_closed(&self) {
        self.active_connections.dec();
    }

    pub fn record_connection_error(&self) {
        self.connection_errors.inc();
    }

    pub fn record_message_received(&self) {
        self.messages_received.inc();
    }

    pub fn record_message_sent(&self) {
        self.messages_sent.inc();
    }

    pub fn record_message_error(&self) {
        self.message_errors.inc();
    }

    /// Record one request-to-echo latency
    pub fn observe_response_time(&self, elapsed: Duration) {
        self.response_time.observe(elapsed.as_secs_f64());
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.get()
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.get()
    }

    pub fn active_connections(&self) -> i64 {
        self.active_connections.get()
    }

    pub fn connection_errors(&self) -> u64 {
        self.connection_errors.get()
    }

    pub fn message_errors(&self) -> u64 {
        self.message_errors.get()
    }

    /// Current response-time distribution
    pub fn response_time(&self) -> HistogramSnapshot {
        let proto = self.response_time.metric();
        let histogram = proto.get_histogram();

        HistogramSnapshot {
            count: histogram.get_sample_count(),
            sum: histogram.get_sample_sum(),
            buckets: histogram
                .get_bucket()
                .iter()
                .map(|bucket| BucketCount {
                    upper_bound: bucket.get_upper_bound(),
                    cumulative_count: bucket.get_cumulative_count(),
                })
                .collect(),
        }
    }

    /// Read every metric once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received(),
            messages_sent: self.messages_sent(),
            active_connections: self.active_connections(),
            connection_errors: self.connection_errors(),
            message_errors: self.message_errors(),
            response_time: self.response_time(),
        }
    }

    /// Export metrics in Prometheus format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!(error = %e, "Failed to encode Prometheus metrics");
            return String::new();
        }

        String::from_utf8(buffer).unwrap_or_else(|e| {
            error!(error = %e, "Prometheus output was not UTF-8");
            String::new()
        })
    }

    /// Content type of [`Metrics::export_prometheus`] output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
