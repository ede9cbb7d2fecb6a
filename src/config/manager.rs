//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::IpAddr;
use std::path::Path;

pub const ENV_PORT: &str = "WSECHO_PORT";
pub const ENV_BIND_ADDR: &str = "WSECHO_BIND_ADDR";
pub const ENV_IDLE_TIMEOUT: &str = "WSECHO_IDLE_TIMEOUT";
pub const ENV_MAX_CONNECTIONS: &str = "WSECHO_MAX_CONNECTIONS";
pub const ENV_LOG_LEVEL: &str = "WSECHO_LOG_LEVEL";

const MIN_BUFFER_SIZE: usize = 1024;
const MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            tracing::info!("Configuration loaded and validated successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

}

impl Config {
    /// Override fields from environment-style lookups.
    ///
    /// Takes a lookup function so the same rules apply to the process
    /// environment and to tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid {}: {}", ENV_PORT, port))?;
        }

        if let Some(host) = lookup(ENV_BIND_ADDR).filter(|v| !v.trim().is_empty()) {
            self.server.host = host
                .trim()
                .parse::<IpAddr>()
                .with_context(|| format!("Invalid {}: {}", ENV_BIND_ADDR, host))?;
        }

        if let Some(timeout) = lookup(ENV_IDLE_TIMEOUT).filter(|v| !v.trim().is_empty()) {
            self.server.idle_timeout = Some(
                humantime::parse_duration(timeout.trim())
                    .with_context(|| format!("Invalid {}: {}", ENV_IDLE_TIMEOUT, timeout))?,
            );
        }

        if let Some(max_conn) = lookup(ENV_MAX_CONNECTIONS).filter(|v| !v.trim().is_empty()) {
            self.server.max_connections = Some(
                max_conn
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid {}: {}", ENV_MAX_CONNECTIONS, max_conn))?,
            );
        }

        if let Some(log_level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.monitoring.log_level = log_level.trim().to_lowercase();
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        let write_buffer_size = self.server.write_buffer_size;
        if write_buffer_size < MIN_BUFFER_SIZE {
            bail!("write_buffer_size must be at least {} bytes", MIN_BUFFER_SIZE);
        }
        if write_buffer_size > MAX_BUFFER_SIZE {
            bail!("write_buffer_size cannot exceed 1MB");
        }

        if self.server.max_message_size < MIN_BUFFER_SIZE {
            bail!("max_message_size must be at least {} bytes", MIN_BUFFER_SIZE);
        }

        if let Some(timeout) = self.server.idle_timeout {
            if timeout.is_zero() {
                bail!("idle_timeout must be greater than 0 when set");
            }
        }

        if self.server.max_connections == Some(0) {
            bail!("max_connections must be greater than 0 when set");
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        host: Option<IpAddr>,
        port: Option<u16>,
        max_connections: Option<usize>,
        idle_timeout: Option<std::time::Duration>,
        greeting: bool,
    ) {
        if let Some(host) = host {
            self.server.host = host;
            tracing::info!("CLI override: host set to {}", host);
        }

        if let Some(port) = port {
            self.server.port = port;
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(max_conn) = max_connections {
            self.server.max_connections = Some(max_conn);
            tracing::info!("CLI override: max connections set to {}", max_conn);
        }

        if let Some(timeout) = idle_timeout {
            self.server.idle_timeout = Some(timeout);
            tracing::info!("CLI override: idle timeout set to {:?}", timeout);
        }

        if greeting {
            self.server.greeting = true;
            tracing::info!("CLI override: greeting enabled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, crate::config::DEFAULT_PORT);
        assert_eq!(config.server.write_buffer_size, 8192);
        assert_eq!(config.server.max_message_size, 64 * 1024 * 1024);
        assert!(config.server.idle_timeout.is_none());
        assert!(config.server.max_connections.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[
                (ENV_PORT, "4100"),
                (ENV_BIND_ADDR, "127.0.0.1"),
                (ENV_IDLE_TIMEOUT, "30s"),
                (ENV_MAX_CONNECTIONS, "64"),
                (ENV_LOG_LEVEL, "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind_addr().to_string(), "127.0.0.1:4100");
        assert_eq!(config.server.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.server.max_connections, Some(64));
        assert_eq!(config.monitoring.log_level, "debug");
    }

    #[test]
    fn test_empty_port_falls_back_to_default() {
        let mut config = Config::default();
        config.apply_env(lookup_from(&[(ENV_PORT, "")])).unwrap();
        assert_eq!(config.server.port, crate::config::DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(lookup_from(&[(ENV_PORT, "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.server.write_buffer_size = 512;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.max_message_size = 512;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.idle_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.max_connections = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.monitoring.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[(ENV_PORT, "4100")]))
            .unwrap();
        config.merge_with_cli_args(
            Some("127.0.0.1".parse().unwrap()),
            Some(5000),
            Some(8),
            Some(Duration::from_secs(5)),
            true,
        );

        assert_eq!(config.server.bind_addr().to_string(), "127.0.0.1:5000");
        assert_eq!(config.server.max_connections, Some(8));
        assert_eq!(config.server.idle_timeout, Some(Duration::from_secs(5)));
        assert!(config.server.greeting);
    }
}
