//! WsEcho - WebSocket envelope echo server
//!
//! Accepts WebSocket connections on `/ws`, echoes every valid binary
//! envelope back to its sender, and exposes Prometheus metrics on `/metrics`.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsecho::{config::ConfigManager, EchoServer, Metrics, ShutdownCoordinator};

/// CLI arguments for WsEcho
#[derive(Parser, Debug)]
#[command(name = "wsecho")]
#[command(about = "WsEcho - WebSocket envelope echo server")]
#[command(version)]
#[command(long_about = "
WsEcho - WebSocket envelope echo server

Configuration priority (highest to lowest):
1. Command-line arguments
2. Environment variables
3. Configuration file
4. Built-in defaults

Environment variables:
  WSECHO_PORT             - Listening port (default 3002)
  WSECHO_BIND_ADDR        - Listening host (default 0.0.0.0)
  WSECHO_IDLE_TIMEOUT     - Close silent sockets after this long (e.g. 5m, 30s)
  WSECHO_MAX_CONNECTIONS  - Maximum concurrent sockets
  WSECHO_LOG_LEVEL        - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "wsecho.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Host to bind to (overrides config and environment)
    #[arg(short, long, help = "Host to bind to (e.g., 127.0.0.1)")]
    pub bind: Option<IpAddr>,

    /// Port to bind to (overrides config and environment)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Maximum number of concurrent connections
    #[arg(long, help = "Maximum number of concurrent connections")]
    pub max_connections: Option<usize>,

    /// Idle timeout (e.g. 30s, 5m)
    #[arg(long, value_parser = humantime::parse_duration, help = "Close connections idle for this long")]
    pub idle_timeout: Option<Duration>,

    /// Send a greeting envelope on connect
    #[arg(long, help = "Send a greeting envelope on connect")]
    pub greeting: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > environment > config file > defaults
    let mut config = ConfigManager::load_from_file(&args.config)?;
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(level) = &args.log_level {
        config.monitoring.log_level = level.to_lowercase();
    }

    init_tracing(&args, &config.monitoring.log_level)?;

    info!(
        "Starting WsEcho v{} - WebSocket envelope echo server",
        env!("CARGO_PKG_VERSION")
    );

    config.merge_with_cli_args(
        args.bind,
        args.port,
        args.max_connections,
        args.idle_timeout,
        args.greeting,
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("Configuration summary:");
        info!("  Bind address: {}", config.server.bind_addr());
        info!(
            "  Buffers: write {} bytes, max message {} bytes",
            config.server.write_buffer_size,
            config.server.max_message_size
        );
        info!("  Max connections: {:?}", config.server.max_connections);
        info!("  Idle timeout: {:?}", config.server.idle_timeout);
        info!("  Greeting: {}", config.server.greeting);
        return Ok(());
    }

    let metrics = Arc::new(Metrics::new()?);
    if config.monitoring.process_metrics {
        if let Err(e) = metrics.register_process_metrics() {
            warn!("Process metrics unavailable: {}", e);
        }
    }

    let shutdown_coordinator = ShutdownCoordinator::new(config.server.shutdown_timeout);

    let server = EchoServer::bind(&config, Arc::clone(&metrics), shutdown_coordinator.subscribe())
        .await?;
    info!("Listening on {}", server.local_addr());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shutdown gracefully");

    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        shutdown_coordinator.trigger();
    }

    info!("Initiating graceful shutdown...");

    if let Err(e) = server_handle.await {
        if !e.is_cancelled() {
            error!("Server task failed: {}", e);
        }
    }

    shutdown_coordinator.wait_for_connections(&metrics).await;

    let snapshot = metrics.snapshot();
    info!(
        messages_received = snapshot.messages_received,
        messages_sent = snapshot.messages_sent,
        connection_errors = snapshot.connection_errors,
        message_errors = snapshot.message_errors,
        "Server shutdown complete"
    );

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, configured_level: &str) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        configured_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
