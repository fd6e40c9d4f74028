//! # Beacon Edge Device
//!
//! Telemetry simulator entry point.
//!
//! ## Process Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Edge Device Process                              │
//! │                                                                         │
//! │  start ──► tracing init ──► config load ──► UplinkAgent::start()       │
//! │                                                   │                     │
//! │                                     ticks & lifecycle events run        │
//! │                                                   │                     │
//! │  SIGINT / SIGTERM ──► scoped shutdown ────────────┘                     │
//! │                       (stop ticks, close link, flush cache)            │
//! │                       then exit 0                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use beacon_uplink::{UplinkAgent, UplinkConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .init();

    info!("Starting Beacon edge device simulator...");

    // Load configuration (file + defaults; no flags, no env overrides)
    let config = UplinkConfig::load_or_default(None);
    info!(
        device_id = %config.device_id(),
        broker = %config.broker.url,
        tick_ms = config.tick_interval_ms,
        "Configuration loaded"
    );

    // Start the uplink agent
    let mut agent = UplinkAgent::new(config);
    agent.start().await?;

    // Run until a termination signal arrives
    shutdown_signal().await;

    // Scoped shutdown: stop ticks, close the link, flush the cache
    agent.shutdown().await?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
