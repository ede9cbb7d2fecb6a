//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE};

/// Port used when neither the config file, the environment nor the CLI set one
pub const DEFAULT_PORT: u16 = 3002;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub monitoring: MonitoringConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub write_buffer_size: usize,
    /// Largest inbound message accepted before the read fails
    pub max_message_size: usize,
    /// Upper bound on concurrently open sockets; unbounded when absent
    pub max_connections: Option<usize>,
    /// Close sockets that stay silent this long; wait forever when absent
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// Send a server greeting envelope right after the upgrade
    pub greeting: bool,
}

/// Monitoring configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub process_metrics: bool,
}

impl ServerConfig {
    /// Socket address the HTTP listener binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_connections: None,
            idle_timeout: None,
            shutdown_timeout: Duration::from_secs(10),
            greeting: false,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            process_metrics: cfg!(target_os = "linux"),
        }
    }
}
