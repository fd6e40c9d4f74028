//! # beacon-uplink: Uplink Engine for Beacon
//!
//! This crate provides the publish/cache reconciliation core of the Beacon
//! edge telemetry simulator: on every tick a record is either delivered live
//! to the broker or appended to the durable cache, and the cached backlog is
//! replayed in order exactly once per reconnection.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Uplink Agent Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     UplinkAgent (Orchestrator)                   │  │
//! │  │                                                                  │  │
//! │  │  One select! loop merges the tick timer and the transport's      │  │
//! │  │  lifecycle events; no other component sees both sources.         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │   Transport    │  │ConnectionMonitor│ │  PublishCoordinator    │    │
//! │  │   (WebSocket)  │  │                │  │                        │    │
//! │  │                │  │ Sole writer of │  │ Sole mutator of the    │    │
//! │  │ Emits LinkEvent│  │ ConnectionState│  │ cache sequence;        │    │
//! │  │ lifecycle      │  │ last-write-wins│  │ live-send vs cache,    │    │
//! │  │ stream         │  │                │  │ FIFO replay on connect │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  DECISION TABLE (per tick)                                             │
//! │  ─────────────────────────                                             │
//! │  connected, publish ok      → record discarded                         │
//! │  connected, publish failed  → record cached (same as offline)          │
//! │  not connected              → record cached, no send attempt           │
//! │                                                                         │
//! │  ON TRANSITION INTO CONNECTED (exactly once per transition)            │
//! │  ─────────────────────────────────────────────────────────             │
//! │  drain cache atomically → replay in insertion order, fire-and-forget   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - Main `UplinkAgent` orchestrator and status reporting
//! - [`config`] - Uplink configuration (broker URL, tick period, cache path)
//! - [`coordinator`] - The live-send vs cache decision engine
//! - [`error`] - Uplink error types
//! - [`monitor`] - Connection state machine fed by lifecycle events
//! - [`protocol`] - Wire envelope for broker publishes
//! - [`transport`] - WebSocket client with reconnection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use beacon_uplink::{UplinkAgent, UplinkConfig};
//!
//! let config = UplinkConfig::load_or_default(None);
//! let mut agent = UplinkAgent::new(config);
//! agent.start().await?;
//!
//! // ... run until a shutdown signal ...
//!
//! agent.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{UplinkAgent, UplinkStatus};
pub use config::UplinkConfig;
pub use coordinator::{PublishCoordinator, TickOutcome};
pub use error::{UplinkError, UplinkResult};
pub use monitor::{ConnectionMonitor, ConnectionState, LinkEvent};
pub use protocol::BrokerFrame;
pub use transport::{Transport, TransportConfig, TransportHandle};
