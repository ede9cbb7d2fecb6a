//! Metrics Module
//!
//! Process-wide counters, gauge and latency histogram, plus export.

pub mod collector;
pub mod types;

pub use collector::{Metrics, RESPONSE_TIME_BUCKETS};
pub use types::{BucketCount, HistogramSnapshot, MetricsSnapshot};
