//! # Gyropad Bridge
//!
//! Turn a phone's gyroscope and touch sliders into a virtual game controller.
//!
//! ```bash
//! gyropad-bridge                      # uses config/default.toml
//! gyropad-bridge my-car.toml
//! RUST_LOG=debug gyropad-bridge
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use gyropad_bridge::config::{Config, LoggingConfig};
use gyropad_bridge::device::open_backend;
use gyropad_bridge::engine::Engine;
use gyropad_bridge::overlay::{LogRenderer, OverlayWorker};
use gyropad_bridge::telemetry::AxisLogger;
use gyropad_bridge::transport;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point.
///
/// 1. Load configuration and set up logging
/// 2. Open the virtual controller (null backend if uinput is unavailable)
/// 3. Start the overlay worker and the engine thread
/// 4. Accept phone sessions until Ctrl+C or SIGTERM
/// 5. Reset and close the controller, then stop the overlay
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let (config, loaded_from_file) = if Path::new(&config_path).exists() {
        let config = Config::load(&config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?;
        (config, true)
    } else {
        (Config::from_toml("")?, false)
    };

    let _log_guard = init_logging(&config.logging)?;

    info!("Gyropad Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    if loaded_from_file {
        info!("Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, using built-in defaults", config_path);
    }

    let snapshot = config.mapping_snapshot()?;
    let topology = snapshot.topology;
    info!(
        "Mode {:?}, topology {}, {} axis bindings",
        config.device.mode,
        topology,
        snapshot.axes.len()
    );

    let device = open_backend(topology, config.backend(), &config.device.name);

    let overlay = config
        .overlay
        .enabled
        .then(|| OverlayWorker::spawn(config.overlay.queue_size, LogRenderer::default()));

    let mut engine = Engine::new(config.device.mode, snapshot, device)?;
    if let Some(worker) = &overlay {
        engine = engine.with_overlay(worker.handle());
    }
    if config.telemetry.enabled {
        engine = engine.with_telemetry(AxisLogger::from_config(&config.telemetry)?);
    }
    let (handle, engine_thread) = engine.spawn(config.server.engine_queue_size)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to listen on {}", addr))?;

    info!("Listening for phones on {}", listener.local_addr()?);
    info!("Press Ctrl+C to exit");
    transport::serve(
        listener,
        handle.clone(),
        config.server.session_queue_size,
        shutdown_signal(),
    )
    .await;

    info!("Shutting down...");
    if let Err(e) = handle.shutdown().await {
        warn!("Engine already stopped: {}", e);
    }
    drop(handle);
    if engine_thread.join().is_err() {
        error!("Engine thread panicked");
    }

    if let Some(worker) = overlay {
        worker
            .shutdown(Duration::from_millis(config.overlay.shutdown_grace_ms))
            .await;
    }

    info!("Goodbye");
    Ok(())
}

/// Console logging plus an optional daily-rolling file.
///
/// `RUST_LOG` overrides the configured level. The returned guard must be held
/// until exit so buffered file output is flushed.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &config.file {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gyropad-bridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_built_in_defaults_are_valid() {
        let config = Config::from_toml("").unwrap();
        assert!(config.mapping_snapshot().is_ok());
    }
}
