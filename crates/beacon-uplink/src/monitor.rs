//! # Connection Monitor
//!
//! Tracks the broker link state from transport lifecycle events.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Connection State Machine                             │
//! │                                                                         │
//! │  EVENT          │ STATE AFTER                                          │
//! │  ───────────────┼───────────────────────────────────────────────────   │
//! │  connected      │ Connected (replay trigger fires exactly once per     │
//! │                 │ transition into Connected)                           │
//! │  error          │ unchanged, except Connected degrades to             │
//! │                 │ Disconnected; never a replay trigger by itself       │
//! │  disconnected   │ Disconnected                                         │
//! │  offline        │ Offline                                              │
//! │  reconnecting   │ Connecting (stays non-Connected)                     │
//! │                                                                         │
//! │  Starts Disconnected. Written only here; last-write-wins with no       │
//! │  queuing of state events.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// =============================================================================
// Connection State
// =============================================================================

/// Current state of the broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link, and not currently trying.
    Disconnected,
    /// A connection or reconnection attempt is in progress.
    Connecting,
    /// Link established, live publishing eligible.
    Connected,
    /// Broker unreachable; the device is operating offline.
    Offline,
}

impl ConnectionState {
    /// True only for [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Offline => write!(f, "offline"),
        }
    }
}

// =============================================================================
// Link Events
// =============================================================================

/// Lifecycle notifications from the transport, modeled as one enum so the
/// monitor consumes a single dispatch stream instead of per-callback hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The broker link was established.
    Connected,
    /// A transport-level error occurred (transient signal, logged).
    Error(String),
    /// An established link dropped.
    Disconnected,
    /// A connection attempt failed; the broker is unreachable.
    Offline,
    /// The transport is waiting out the backoff before reconnecting.
    Reconnecting,
}

impl LinkEvent {
    /// Returns the event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            LinkEvent::Connected => "connected",
            LinkEvent::Error(_) => "error",
            LinkEvent::Disconnected => "disconnected",
            LinkEvent::Offline => "offline",
            LinkEvent::Reconnecting => "reconnecting",
        }
    }
}

// =============================================================================
// State Change
// =============================================================================

/// Result of applying one event: the states before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the event was applied.
    pub previous: ConnectionState,
    /// State after the event was applied.
    pub current: ConnectionState,
}

impl StateChange {
    /// True exactly when this event moved the link into Connected from any
    /// other state. Drives the drain-and-replay action, which must fire
    /// once per transition.
    pub fn entered_connected(&self) -> bool {
        self.current == ConnectionState::Connected
            && self.previous != ConnectionState::Connected
    }

    /// True when this event dropped an established link.
    pub fn left_connected(&self) -> bool {
        self.previous == ConnectionState::Connected
            && self.current != ConnectionState::Connected
    }
}

// =============================================================================
// Connection Monitor
// =============================================================================

/// Sole writer of the connection state.
///
/// The state cell is shared (`Arc`) so the coordinator and status queries
/// read the most recently observed value without going through the monitor.
#[derive(Debug, Clone)]
pub struct ConnectionMonitor {
    state: Arc<RwLock<ConnectionState>>,
}

impl ConnectionMonitor {
    /// Creates a monitor in the initial Disconnected state.
    pub fn new() -> Self {
        ConnectionMonitor {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        }
    }

    /// Applies one lifecycle event and returns the resulting transition.
    ///
    /// Must be called from a single consumer loop; ordering of events is
    /// the ordering of the transport's channel.
    pub async fn apply(&self, event: &LinkEvent) -> StateChange {
        let mut state = self.state.write().await;
        let previous = *state;

        let current = match event {
            LinkEvent::Connected => ConnectionState::Connected,
            LinkEvent::Error(detail) => {
                warn!(%detail, "Transport error");
                if previous == ConnectionState::Connected {
                    ConnectionState::Disconnected
                } else {
                    previous
                }
            }
            LinkEvent::Disconnected => ConnectionState::Disconnected,
            LinkEvent::Offline => ConnectionState::Offline,
            LinkEvent::Reconnecting => {
                debug!("Transport reconnecting");
                ConnectionState::Connecting
            }
        };

        *state = current;

        if previous != current {
            info!(from = %previous, to = %current, event = event.name(), "Link state changed");
        }

        StateChange { previous, current }
    }

    /// Returns true if the link is currently Connected.
    ///
    /// Reflects the most recently applied event (last-write-wins).
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_connected()
    }

    /// Returns the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_disconnected() {
        let monitor = ConnectionMonitor::new();
        assert_eq!(monitor.state().await, ConnectionState::Disconnected);
        assert!(!monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_connected_event_enters_connected_once() {
        let monitor = ConnectionMonitor::new();

        let change = monitor.apply(&LinkEvent::Connected).await;
        assert!(change.entered_connected());
        assert!(monitor.is_connected().await);

        // A repeated connected event is not a new transition.
        let change = monitor.apply(&LinkEvent::Connected).await;
        assert!(!change.entered_connected());
    }

    #[tokio::test]
    async fn test_error_degrades_connected_but_is_not_a_trigger() {
        let monitor = ConnectionMonitor::new();
        monitor.apply(&LinkEvent::Connected).await;

        let change = monitor.apply(&LinkEvent::Error("broken pipe".into())).await;
        assert_eq!(change.current, ConnectionState::Disconnected);
        assert!(!change.entered_connected());
        assert!(change.left_connected());
    }

    #[tokio::test]
    async fn test_error_while_offline_keeps_state() {
        let monitor = ConnectionMonitor::new();
        monitor.apply(&LinkEvent::Offline).await;

        let change = monitor.apply(&LinkEvent::Error("dns failure".into())).await;
        assert_eq!(change.current, ConnectionState::Offline);
    }

    #[tokio::test]
    async fn test_offline_and_disconnected_block_live_publish() {
        let monitor = ConnectionMonitor::new();

        monitor.apply(&LinkEvent::Connected).await;
        monitor.apply(&LinkEvent::Offline).await;
        assert!(!monitor.is_connected().await);

        monitor.apply(&LinkEvent::Connected).await;
        monitor.apply(&LinkEvent::Disconnected).await;
        assert!(!monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_reconnecting_stays_non_connected() {
        let monitor = ConnectionMonitor::new();
        let change = monitor.apply(&LinkEvent::Reconnecting).await;
        assert_eq!(change.current, ConnectionState::Connecting);
        assert!(!monitor.is_connected().await);
    }

    #[tokio::test]
    async fn test_reconnect_cycle_triggers_again() {
        let monitor = ConnectionMonitor::new();

        assert!(monitor.apply(&LinkEvent::Connected).await.entered_connected());
        monitor.apply(&LinkEvent::Disconnected).await;
        monitor.apply(&LinkEvent::Reconnecting).await;
        assert!(monitor.apply(&LinkEvent::Connected).await.entered_connected());
    }
}
