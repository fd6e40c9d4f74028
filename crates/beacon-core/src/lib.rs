//! # beacon-core: Domain Types for Beacon
//!
//! This crate provides the pure domain layer for the Beacon edge telemetry
//! simulator: the telemetry record shape and the synthetic reading generator.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Beacon Data Flow                                 │
//! │                                                                         │
//! │  Timer tick                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   beacon-core (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────────┐        ┌──────────────────────────────┐ │   │
//! │  │   │ ReadingGenerator │ ─────► │ TelemetryRecord              │ │   │
//! │  │   │ (generator.rs)   │        │ (telemetry.rs)               │ │   │
//! │  │   │                  │        │                              │ │   │
//! │  │   │ One record per   │        │ Immutable, serializable,     │ │   │
//! │  │   │ invocation       │        │ stable shape across calls    │ │   │
//! │  │   └──────────────────┘        └──────────────────────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  beacon-uplink (live publish)  /  beacon-cache (durable queue)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`telemetry`] - The telemetry record and reading types
//! - [`generator`] - Synthetic reading generation

// =============================================================================
// Module Declarations
// =============================================================================

pub mod generator;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use generator::ReadingGenerator;
pub use telemetry::{SensorReadings, TelemetryRecord};
