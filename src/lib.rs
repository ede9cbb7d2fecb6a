//! WsEcho Library
//!
//! WebSocket endpoint that decodes binary envelope frames, echoes them back
//! to their sender, and keeps Prometheus counters for traffic, latency and
//! failures across all open connections.

pub mod config;
pub mod connection;
pub mod metrics;
pub mod protocol;
pub mod server;
pub mod shutdown;

pub use config::Config;
pub use connection::ConnectionHandler;
pub use metrics::Metrics;
pub use protocol::Envelope;
pub use server::EchoServer;
pub use shutdown::ShutdownCoordinator;

/// Common error type for the echo server
pub type Result<T> = anyhow::Result<T>;
