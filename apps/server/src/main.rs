//! Cuelist Server - Standalone headless playout control server.
//!
//! This binary exposes the Cuelist control plane over HTTP/SSE without a
//! GUI. It's designed for rack deployments where the control service runs
//! as a background daemon next to the playout devices.

mod config;
mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cuelist_core::{bootstrap_services, start_server, AppState, ProjectSource};
use tokio::signal;

use crate::config::ServerConfig;
use crate::store::JsonProjectSource;

/// Cuelist Server - Headless broadcast playout control server.
#[derive(Parser, Debug)]
#[command(name = "cuelist-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CUELIST_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "CUELIST_BIND_PORT")]
    port: Option<u16>,

    /// Project bundle file (overrides config file).
    #[arg(short = 'f', long, env = "CUELIST_PROJECT_FILE")]
    project_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Cuelist Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(project_file) = args.project_file {
        config.project_file = Some(project_file);
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    log::info!(
        "Configuration: bind_port={}, devices={}",
        config.bind_port,
        core_config.devices.len()
    );

    // Project library: JSON bundle file, or an empty source when not configured
    let source: Arc<dyn ProjectSource> = match &config.project_file {
        Some(path) => {
            log::info!("Using project file: {}", path.display());
            Arc::new(JsonProjectSource::from_file(path).context("Failed to load project file")?)
        }
        None => {
            log::info!("No project file configured - project loads will fail until one is provided");
            Arc::new(JsonProjectSource::empty())
        }
    };

    // Bootstrap services
    let services = bootstrap_services(&core_config, source);
    log::info!("Services bootstrapped successfully");

    if config.connect_on_start {
        let failures = services.registry.connect_all().await;
        for failure in &failures {
            log::warn!(
                "Startup connect failed for '{}': {}",
                failure.device_id,
                failure.error
            );
        }
    }

    // Build app state for the HTTP server
    let app_state = AppState {
        orchestrator: Arc::clone(&services.orchestrator),
        registry: Arc::clone(&services.registry),
        runtime: Arc::clone(&services.runtime),
        fanout: Arc::clone(&services.fanout),
        config: Arc::new(core_config),
    };

    // Spawn HTTP server on the main tokio runtime
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(app_state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("HTTP server started on port {}", config.bind_port);

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    // Graceful shutdown
    services.shutdown().await;
    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
