//! # Uplink Agent
//!
//! Main orchestrator for the simulator. Merges the tick timer and the
//! transport's lifecycle events into one loop and drives the coordinator.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       UplinkAgent Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                         UplinkAgent                              │  │
//! │  │                                                                  │  │
//! │  │  • Spawns the transport and the event loop                       │  │
//! │  │  • One select! merges ticks and lifecycle events                 │  │
//! │  │  • Applies events through the monitor, triggers replay           │  │
//! │  │  • Runs the scoped shutdown sequence                             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   Transport    │  │ConnectionMonitor│ │  PublishCoordinator    │    │
//! │  │   (WebSocket)  │  │ (state machine)│  │  (decision engine)     │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  SCOPED SHUTDOWN (always completes, faults are logged)                 │
//! │  ─────────────────────────────────────────────────────                 │
//! │  (a) stop the loop — no new ticks are scheduled                        │
//! │  (b) close the transport connection                                    │
//! │  (c) force a final persist of the in-memory cache                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use beacon_cache::CacheStore;
use beacon_core::ReadingGenerator;

use crate::config::UplinkConfig;
use crate::coordinator::{PublishCoordinator, TickOutcome};
use crate::error::UplinkResult;
use crate::monitor::{ConnectionMonitor, ConnectionState, LinkEvent};
use crate::transport::{Transport, TransportHandle};

// =============================================================================
// Uplink Status
// =============================================================================

/// Current uplink status for external queries.
#[derive(Debug, Clone)]
pub struct UplinkStatus {
    /// Current connection state.
    pub connection_state: ConnectionState,

    /// Whether currently connected to the broker.
    pub is_connected: bool,

    /// Number of records in the durable cache.
    pub pending_count: usize,

    /// Records delivered live since startup.
    pub published_count: u64,

    /// Records replayed from the cache since startup.
    pub replayed_count: u64,

    /// Timestamp of the last successful live publish.
    pub last_publish: Option<DateTime<Utc>>,

    /// Last transport error message (if any).
    pub last_error: Option<String>,
}

impl Default for UplinkStatus {
    fn default() -> Self {
        UplinkStatus {
            connection_state: ConnectionState::Disconnected,
            is_connected: false,
            pending_count: 0,
            published_count: 0,
            replayed_count: 0,
            last_publish: None,
            last_error: None,
        }
    }
}

// =============================================================================
// Uplink Agent
// =============================================================================

/// Main agent that owns the simulator's moving parts.
pub struct UplinkAgent {
    /// Uplink configuration.
    config: Arc<UplinkConfig>,

    /// Current status.
    status: Arc<RwLock<UplinkStatus>>,

    /// Shutdown sender for the event loop.
    shutdown_tx: Option<mpsc::Sender<()>>,

    /// Transport handle (set after start).
    transport: Option<TransportHandle>,

    /// Coordinator (set after start).
    coordinator: Option<Arc<PublishCoordinator>>,

    /// Join handle of the event loop.
    loop_handle: Option<JoinHandle<()>>,
}

impl UplinkAgent {
    /// Creates a new agent.
    pub fn new(config: UplinkConfig) -> Self {
        UplinkAgent {
            config: Arc::new(config),
            status: Arc::new(RwLock::new(UplinkStatus::default())),
            shutdown_tx: None,
            transport: None,
            coordinator: None,
            loop_handle: None,
        }
    }

    /// Returns the current uplink status.
    pub async fn status(&self) -> UplinkStatus {
        self.status.read().await.clone()
    }

    /// Starts the agent.
    ///
    /// Spawns the transport and the event loop. The agent runs until
    /// [`UplinkAgent::shutdown`] is called.
    pub async fn start(&mut self) -> UplinkResult<()> {
        self.config.validate()?;

        info!(
            device_id = %self.config.device_id(),
            broker = %self.config.broker.url,
            tick_ms = self.config.tick_interval_ms,
            "Starting uplink agent"
        );

        // Open the cache; records from a previous run are restored here.
        let store = CacheStore::open(self.config.cache_path());
        {
            let mut s = self.status.write().await;
            s.pending_count = store.len();
        }

        let generator = ReadingGenerator::new(
            self.config.device.id.clone(),
            self.config.device.firmware.clone(),
        );

        // Spawn transport
        let (transport_handle, event_rx) = Transport::spawn(self.config.transport_config());
        self.transport = Some(transport_handle.clone());

        // Wire the monitor and the coordinator
        let monitor = ConnectionMonitor::new();
        let coordinator = Arc::new(PublishCoordinator::new(
            generator,
            store,
            monitor.clone(),
            transport_handle,
            self.config.topic(),
        ));
        self.coordinator = Some(coordinator.clone());

        // Create shutdown channel and spawn the loop
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        self.loop_handle = Some(tokio::spawn(Self::run_loop(
            self.config.clone(),
            self.status.clone(),
            monitor,
            coordinator,
            event_rx,
            shutdown_rx,
        )));

        info!("Uplink agent started");
        Ok(())
    }

    /// Main event loop: one timeline for ticks and lifecycle events.
    async fn run_loop(
        config: Arc<UplinkConfig>,
        status: Arc<RwLock<UplinkStatus>>,
        monitor: ConnectionMonitor,
        coordinator: Arc<PublishCoordinator>,
        mut event_rx: mpsc::Receiver<LinkEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(config.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The interval yields immediately; the first snapshot is due one
        // full period after startup.
        interval.tick().await;

        loop {
            tokio::select! {
                // Timer tick: generate and publish-or-cache
                _ = interval.tick() => {
                    let outcome = coordinator.on_tick().await;
                    let pending = coordinator.pending_count().await;

                    let mut s = status.write().await;
                    if outcome == TickOutcome::Published {
                        s.published_count += 1;
                        s.last_publish = Some(Utc::now());
                    }
                    s.pending_count = pending;
                }

                // Lifecycle event from the transport
                Some(event) = event_rx.recv() => {
                    let change = monitor.apply(&event).await;

                    match &event {
                        LinkEvent::Offline if change.previous != ConnectionState::Offline => {
                            error!("Broker not available, caching telemetry locally");
                        }
                        LinkEvent::Disconnected if change.left_connected() => {
                            warn!("Connection lost, falling back to cache");
                        }
                        LinkEvent::Error(detail) => {
                            status.write().await.last_error = Some(detail.clone());
                        }
                        _ => {}
                    }

                    // Exactly once per transition into Connected
                    if change.entered_connected() {
                        let replayed = coordinator.on_connected().await;
                        if replayed > 0 {
                            info!(count = replayed, "Cached backlog replayed");
                        }
                        status.write().await.replayed_count += replayed as u64;
                    }

                    let pending = coordinator.pending_count().await;
                    let mut s = status.write().await;
                    s.connection_state = change.current;
                    s.is_connected = change.current.is_connected();
                    s.pending_count = pending;
                }

                // Shutdown
                _ = shutdown_rx.recv() => {
                    info!("Uplink loop received shutdown");
                    break;
                }
            }
        }

        info!("Uplink loop stopped");
    }

    /// Stops the agent with the scoped shutdown sequence.
    ///
    /// Every step runs even if an earlier one faulted; the final cache
    /// persist is always attempted.
    pub async fn shutdown(&mut self) -> UplinkResult<()> {
        info!("Shutting down uplink agent");

        // (a) stop the loop so no new ticks are scheduled
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.loop_handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Uplink loop join failed");
            }
        }

        // (b) close the transport connection
        if let Some(ref transport) = self.transport {
            if let Err(e) = transport.shutdown().await {
                warn!(error = %e, "Transport shutdown signal failed");
            }
        }

        // (c) final persist of any in-memory cached records
        if let Some(ref coordinator) = self.coordinator {
            match coordinator.flush().await {
                Ok(()) => info!("Final cache flush complete"),
                Err(e) => warn!(error = %e, "Final cache flush failed"),
            }
        }

        let mut s = self.status.write().await;
        s.connection_state = ConnectionState::Disconnected;
        s.is_connected = false;

        info!("Uplink agent stopped");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uplink_status_default() {
        let status = UplinkStatus::default();
        assert_eq!(status.connection_state, ConnectionState::Disconnected);
        assert!(!status.is_connected);
        assert_eq!(status.pending_count, 0);
        assert_eq!(status.published_count, 0);
    }

    #[tokio::test]
    async fn test_offline_agent_caches_ticks_and_flushes_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("pending.json");

        let mut config = UplinkConfig::default();
        // Nothing listens on the discard port; every connect attempt fails.
        config.broker.url = "ws://127.0.0.1:9/".into();
        config.broker.reconnect_interval_ms = 50;
        config.cache.file = Some(cache_path.clone());
        config.tick_interval_ms = 50;

        let mut agent = UplinkAgent::new(config);
        agent.start().await.unwrap();

        // Let a few ticks elapse while the broker is unreachable.
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        agent.shutdown().await.unwrap();

        let status = agent.status().await;
        assert_eq!(status.published_count, 0);
        assert!(status.pending_count >= 2);

        // The cached records survived shutdown on disk.
        let store = CacheStore::open(&cache_path);
        assert_eq!(store.len(), status.pending_count);
    }
}
