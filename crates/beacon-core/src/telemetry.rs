//! # Telemetry Types
//!
//! The record shape published to the broker and persisted in the cache.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Telemetry Types                                   │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │   TelemetryRecord    │        │   SensorReadings     │              │
//! │  │  ──────────────────  │        │  ──────────────────  │              │
//! │  │  id (UUID)           │───────►│  temperature_c       │              │
//! │  │  device_id           │        │  humidity_pct        │              │
//! │  │  captured_at         │        │  pressure_hpa        │              │
//! │  │  firmware            │        └──────────────────────┘              │
//! │  │  readings            │                                              │
//! │  │  battery_percent     │                                              │
//! │  │  signal_dbm          │                                              │
//! │  └──────────────────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! A record has a UUID for traceability in broker-side pipelines, but the
//! cache keys records only by insertion order. Records are never mutated
//! after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Sensor Readings
// =============================================================================

/// One snapshot of the simulated environmental sensors.
///
/// The field set is fixed so downstream serialization never needs per-call
/// schema handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f64,

    /// Relative humidity in percent (0-100).
    pub humidity_pct: f64,

    /// Barometric pressure in hectopascals.
    pub pressure_hpa: f64,
}

// =============================================================================
// Telemetry Record
// =============================================================================

/// A single telemetry snapshot produced once per tick.
///
/// Immutable after creation. Serialized as a flat object with one nested
/// `readings` object, both in the cache file and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,

    /// Identifier of the device that produced this record.
    pub device_id: String,

    /// Capture timestamp (UTC).
    pub captured_at: DateTime<Utc>,

    /// Firmware version string reported by the device.
    pub firmware: String,

    /// Environmental sensor readings.
    pub readings: SensorReadings,

    /// Remaining battery charge in percent (0-100).
    pub battery_percent: f64,

    /// Radio signal strength in dBm.
    pub signal_dbm: i32,
}
