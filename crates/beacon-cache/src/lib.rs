//! # beacon-cache: Durable Cache Store for Beacon
//!
//! This crate provides the durable pending queue for the Beacon simulator.
//! Records that cannot be delivered live are appended here and replayed in
//! insertion order once the broker connection is re-established.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Beacon Cache Flow                                │
//! │                                                                         │
//! │  Publish Coordinator (beacon-uplink)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   beacon-cache (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────────┐         ┌───────────────────────────┐  │   │
//! │  │   │    CacheStore     │         │       CacheError          │  │   │
//! │  │   │    (store.rs)     │         │       (error.rs)          │  │   │
//! │  │   │                   │         │                           │  │   │
//! │  │   │ open / append /   │         │ PersistFailed             │  │   │
//! │  │   │ drain_all /       │         │ SerializeFailed           │  │   │
//! │  │   │ persist           │         │                           │  │   │
//! │  │   └───────────────────┘         └───────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pending.json (single file, JSON array, overwritten in full)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The file-backed FIFO cache store
//! - [`error`] - Cache error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{CacheError, CacheResult};
pub use store::CacheStore;
