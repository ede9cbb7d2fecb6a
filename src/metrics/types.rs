//! Metrics Types

use serde::Serialize;

/// Point-in-time view of the registry.
///
/// Each field is read independently; two fields are not guaranteed to
/// describe the same instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub active_connections: i64,
    pub connection_errors: u64,
    pub message_errors: u64,
    pub response_time: HistogramSnapshot,
}

/// Histogram state: cumulative bucket counts plus sum and count
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub buckets: Vec<BucketCount>,
}

/// Observations at or below `upper_bound` seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}
