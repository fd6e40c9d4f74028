//! # Reading Generator
//!
//! Synthesizes one telemetry record per invocation.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Reading Generator Contract                          │
//! │                                                                         │
//! │  generate() ──► TelemetryRecord                                        │
//! │                                                                         │
//! │  • No inputs beyond process-wide randomness (not reproducible)         │
//! │  • No failure modes                                                    │
//! │  • No side effects beyond value construction                           │
//! │  • Stable field set across calls                                       │
//! │                                                                         │
//! │  SIMULATED RANGES                                                      │
//! │  ────────────────                                                      │
//! │  temperature:   18.0 .. 30.0 °C                                        │
//! │  humidity:      40.0 .. 60.0 %                                         │
//! │  pressure:      988.25 .. 1038.25 hPa                                  │
//! │  battery:       20.0 .. 100.0 %                                        │
//! │  signal:        -90 .. -40 dBm                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use uuid::Uuid;

use crate::telemetry::{SensorReadings, TelemetryRecord};

// =============================================================================
// Reading Generator
// =============================================================================

/// Produces synthetic telemetry snapshots for one simulated device.
#[derive(Debug, Clone)]
pub struct ReadingGenerator {
    /// Identifier stamped on every generated record.
    device_id: String,

    /// Firmware version stamped on every generated record.
    firmware: String,
}

impl ReadingGenerator {
    /// Creates a generator for the given device.
    pub fn new(device_id: impl Into<String>, firmware: impl Into<String>) -> Self {
        ReadingGenerator {
            device_id: device_id.into(),
            firmware: firmware.into(),
        }
    }

    /// Synthesizes one telemetry record.
    ///
    /// Uses the process-wide rng; values land inside plausible physical
    /// ranges but runs are not reproducible.
    pub fn generate(&self) -> TelemetryRecord {
        TelemetryRecord {
            id: Uuid::new_v4().to_string(),
            device_id: self.device_id.clone(),
            captured_at: Utc::now(),
            firmware: self.firmware.clone(),
            readings: SensorReadings {
                temperature_c: 18.0 + rand::random::<f64>() * 12.0,
                humidity_pct: 40.0 + rand::random::<f64>() * 20.0,
                pressure_hpa: 1013.25 + rand::random::<f64>() * 50.0 - 25.0,
            },
            battery_percent: 20.0 + rand::random::<f64>() * 80.0,
            signal_dbm: -90 + (rand::random::<f64>() * 50.0) as i32,
        }
    }

    /// Returns the device ID this generator stamps on records.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_stamps_identity() {
        let generator = ReadingGenerator::new("device-7", "2.0.0");
        let record = generator.generate();
        assert_eq!(record.device_id, "device-7");
        assert_eq!(record.firmware, "2.0.0");
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_generate_values_in_range() {
        let generator = ReadingGenerator::new("device-7", "2.0.0");
        for _ in 0..100 {
            let record = generator.generate();
            assert!((18.0..=30.0).contains(&record.readings.temperature_c));
            assert!((40.0..=60.0).contains(&record.readings.humidity_pct));
            assert!((988.25..=1038.25).contains(&record.readings.pressure_hpa));
            assert!((20.0..=100.0).contains(&record.battery_percent));
            assert!((-90..=-40).contains(&record.signal_dbm));
        }
    }

    #[test]
    fn test_generate_unique_record_ids() {
        let generator = ReadingGenerator::new("device-7", "2.0.0");
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a.id, b.id);
    }
}
