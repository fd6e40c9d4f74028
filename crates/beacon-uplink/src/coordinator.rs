//! # Publish Coordinator
//!
//! The live-send vs cache decision engine.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Publish Coordinator Flow                             │
//! │                                                                         │
//! │  TICK                                                                  │
//! │  ────                                                                  │
//! │  1. Generate one record                                                │
//! │  2. Link connected?                                                    │
//! │     ├── yes → live publish                                             │
//! │     │         ├── ok     → record discarded                            │
//! │     │         └── failed → append to cache (same as offline)           │
//! │     └── no  → append to cache, no send attempt                         │
//! │                                                                         │
//! │  TRANSITION INTO CONNECTED (once per transition)                       │
//! │  ───────────────────────────────────────────────                       │
//! │  3. Drain the cache atomically (snapshot under the lock)               │
//! │  4. Replay every drained record in insertion order, fire-and-forget    │
//! │  5. Zero records → no transport activity                               │
//! │                                                                         │
//! │  INVARIANTS                                                            │
//! │  ──────────                                                            │
//! │  • A record is never both delivered live and cached for one tick       │
//! │  • The coordinator is the only mutator of the cache sequence; one      │
//! │    mutex guards every read-modify-persist                              │
//! │  • Ticks landing mid-replay are not blocked; they go through the       │
//! │    normal connected path and cannot join the drained snapshot          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use beacon_cache::{CacheResult, CacheStore};
use beacon_core::ReadingGenerator;

use crate::monitor::ConnectionMonitor;
use crate::protocol::BrokerFrame;
use crate::transport::TransportHandle;

// =============================================================================
// Tick Outcome
// =============================================================================

/// What happened to the record produced by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Delivered live to the broker.
    Published,
    /// Appended to the durable cache.
    Cached,
}

// =============================================================================
// Publish Coordinator
// =============================================================================

/// Decides, per tick, whether a record is sent live or cached, and replays
/// the cached backlog on reconnection.
pub struct PublishCoordinator {
    /// Synthesizes one record per tick.
    generator: ReadingGenerator,

    /// The durable pending queue. The coordinator holds the only reference.
    cache: Arc<Mutex<CacheStore>>,

    /// Read-only view of the link state.
    monitor: ConnectionMonitor,

    /// Broker uplink.
    transport: TransportHandle,

    /// Destination topic for every record.
    topic: String,
}

impl PublishCoordinator {
    /// Creates a coordinator owning the given cache store.
    pub fn new(
        generator: ReadingGenerator,
        cache: CacheStore,
        monitor: ConnectionMonitor,
        transport: TransportHandle,
        topic: impl Into<String>,
    ) -> Self {
        PublishCoordinator {
            generator,
            cache: Arc::new(Mutex::new(cache)),
            monitor,
            transport,
            topic: topic.into(),
        }
    }

    /// Handles one timer tick: generate, then send live or cache.
    pub async fn on_tick(&self) -> TickOutcome {
        let record = self.generator.generate();

        if !self.monitor.is_connected().await {
            debug!(record_id = %record.id, "Link down, caching record");
            self.cache_record(record).await;
            return TickOutcome::Cached;
        }

        let frame = BrokerFrame::publish(&self.topic, record.clone());
        match self.transport.publish(frame).await {
            Ok(()) => {
                debug!(record_id = %record.id, "Record published live");
                TickOutcome::Published
            }
            Err(e) => {
                // A failed live attempt is treated identically to being
                // offline.
                warn!(error = %e, record_id = %record.id, "Live publish failed, caching record");
                self.cache_record(record).await;
                TickOutcome::Cached
            }
        }
    }

    /// Replays the cached backlog after a transition into Connected.
    ///
    /// Returns the number of records handed to the transport.
    pub async fn on_connected(&self) -> usize {
        // Snapshot first: nothing can be appended and drained in the same
        // operation. Ticks arriving mid-replay take the connected path.
        let drained = { self.cache.lock().await.drain_all() };

        if drained.is_empty() {
            debug!("Cache empty, nothing to replay");
            return 0;
        }

        info!(count = drained.len(), "Replaying cached records in order");

        let mut replayed = 0;
        for record in drained {
            let frame = BrokerFrame::publish(&self.topic, record);
            match self.transport.send(frame).await {
                Ok(()) => replayed += 1,
                Err(e) => {
                    warn!(error = %e, "Failed to queue cached record for replay");
                }
            }
        }

        replayed
    }

    /// Forces a persist of the in-memory sequence (the shutdown flush).
    ///
    /// Retries the disk write even when earlier persists failed.
    pub async fn flush(&self) -> CacheResult<()> {
        self.cache.lock().await.persist()
    }

    /// Number of records currently cached.
    pub async fn pending_count(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn cache_record(&self, record: beacon_core::TelemetryRecord) {
        let mut cache = self.cache.lock().await;
        // A persist failure is already logged by the store; the record is
        // retained in memory either way.
        let _ = cache.append(record);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::error::UplinkError;
    use crate::monitor::LinkEvent;
    use crate::transport::Outgoing;

    /// Transport stand-in: records every accepted frame, replies per script.
    fn test_transport(
        accept: bool,
    ) -> (TransportHandle, mpsc::UnboundedReceiver<BrokerFrame>) {
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Outgoing>(32);
        let (shutdown_tx, _shutdown_rx) = mpsc::channel(1);
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(cmd) = outgoing_rx.recv().await {
                if accept {
                    let _ = seen_tx.send(cmd.frame);
                    if let Some(reply) = cmd.reply {
                        let _ = reply.send(Ok(()));
                    }
                } else if let Some(reply) = cmd.reply {
                    let _ = reply.send(Err(UplinkError::WebSocketError("rejected".into())));
                }
            }
        });

        let handle = TransportHandle::from_parts(
            outgoing_tx,
            shutdown_tx,
            Duration::from_secs(1),
        );
        (handle, seen_rx)
    }

    fn coordinator_with(
        dir: &tempfile::TempDir,
        accept: bool,
    ) -> (
        PublishCoordinator,
        ConnectionMonitor,
        mpsc::UnboundedReceiver<BrokerFrame>,
    ) {
        let store = CacheStore::open(dir.path().join("pending.json"));
        let monitor = ConnectionMonitor::new();
        let (transport, seen) = test_transport(accept);
        let coordinator = PublishCoordinator::new(
            ReadingGenerator::new("device-1", "1.0.0"),
            store,
            monitor.clone(),
            transport,
            "telemetry/device-1",
        );
        (coordinator, monitor, seen)
    }

    async fn next_frame(seen: &mut mpsc::UnboundedReceiver<BrokerFrame>) -> BrokerFrame {
        timeout(Duration::from_secs(1), seen.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("transport channel closed")
    }

    #[tokio::test]
    async fn test_offline_ticks_cache_in_generation_order() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, _monitor, _seen) = coordinator_with(&dir, true);

        for _ in 0..3 {
            assert_eq!(coordinator.on_tick().await, TickOutcome::Cached);
        }
        assert_eq!(coordinator.pending_count().await, 3);

        let drained = { coordinator.cache.lock().await.drain_all() };
        for pair in drained.windows(2) {
            assert!(pair[0].captured_at <= pair[1].captured_at);
        }
    }

    #[tokio::test]
    async fn test_connected_tick_publishes_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, monitor, mut seen) = coordinator_with(&dir, true);
        monitor.apply(&LinkEvent::Connected).await;

        assert_eq!(coordinator.on_tick().await, TickOutcome::Published);

        // Delivered live and NOT cached: mutually exclusive per record.
        assert_eq!(coordinator.pending_count().await, 0);
        let BrokerFrame::Publish(payload) = next_frame(&mut seen).await;
        assert_eq!(payload.topic, "telemetry/device-1");
    }

    #[tokio::test]
    async fn test_failed_publish_caches_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, monitor, mut seen) = coordinator_with(&dir, false);
        monitor.apply(&LinkEvent::Connected).await;

        assert_eq!(coordinator.on_tick().await, TickOutcome::Cached);
        assert_eq!(coordinator.pending_count().await, 1);

        // Nothing reached the broker.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_replay_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");

        // A previous offline run left three records behind.
        {
            let mut store = CacheStore::open(&path);
            let generator = ReadingGenerator::new("device-1", "1.0.0");
            for n in 0..3 {
                let mut record = generator.generate();
                record.id = format!("record-{n}");
                store.append(record).unwrap();
            }
        }

        let store = CacheStore::open(&path);
        let monitor = ConnectionMonitor::new();
        let (transport, mut seen) = test_transport(true);
        let coordinator = PublishCoordinator::new(
            ReadingGenerator::new("device-1", "1.0.0"),
            store,
            monitor.clone(),
            transport,
            "telemetry/device-1",
        );

        monitor.apply(&LinkEvent::Connected).await;
        assert_eq!(coordinator.on_connected().await, 3);

        let mut ids = Vec::new();
        for _ in 0..3 {
            let BrokerFrame::Publish(payload) = next_frame(&mut seen).await;
            ids.push(payload.record.id);
        }
        assert_eq!(ids, ["record-0", "record-1", "record-2"]);
        assert_eq!(coordinator.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_replay_with_empty_cache_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let (coordinator, monitor, mut seen) = coordinator_with(&dir, true);
        monitor.apply(&LinkEvent::Connected).await;

        assert_eq!(coordinator.on_connected().await, 0);
        // Drain is idempotent: a second trigger also replays nothing.
        assert_eq!(coordinator.on_connected().await, 0);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_flush_persists_after_earlier_failures() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("spool");
        let path = sub.join("pending.json");

        let store = CacheStore::open(&path);
        let monitor = ConnectionMonitor::new();
        let (transport, _seen) = test_transport(true);
        let coordinator = PublishCoordinator::new(
            ReadingGenerator::new("device-1", "1.0.0"),
            store,
            monitor,
            transport,
            "telemetry/device-1",
        );

        // Storage disappears: appends fail to persist but stay in memory.
        std::fs::remove_dir_all(&sub).unwrap();
        coordinator.on_tick().await;
        coordinator.on_tick().await;
        assert_eq!(coordinator.pending_count().await, 2);

        // Storage returns; the final flush writes both records.
        std::fs::create_dir_all(&sub).unwrap();
        coordinator.flush().await.unwrap();

        let reopened = CacheStore::open(&path);
        assert_eq!(reopened.len(), 2);
    }
}
