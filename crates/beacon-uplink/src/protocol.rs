//! # Broker Wire Protocol
//!
//! The envelope the simulator writes to the broker connection.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Broker Frames                                     │
//! │                                                                         │
//! │  PUBLISH (device → broker)                                             │
//! │  ─────────────────────────                                             │
//! │  device ───► Publish { topic, device_id, record }                      │
//! │                                                                         │
//! │  The reference design is publish-only: the device never consumes       │
//! │  broker frames, and delivery has no acknowledgment beyond the          │
//! │  transport's own publish outcome.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Frames are serialized as tagged JSON using serde's adjacently tagged enum:
//! ```json
//! { "type": "Publish", "payload": { "topic": "telemetry/dev-1", ... } }
//! ```

use serde::{Deserialize, Serialize};

use beacon_core::TelemetryRecord;

use crate::error::{UplinkError, UplinkResult};

// =============================================================================
// Broker Frame (Tagged Union)
// =============================================================================

/// All frames the simulator exchanges with the broker.
///
/// Uses serde's adjacently tagged enum for clean JSON serialization:
/// `{ "type": "Publish", "payload": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BrokerFrame {
    /// One telemetry record addressed to a topic.
    Publish(PublishPayload),
}

/// Payload of a publish frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishPayload {
    /// Destination topic, e.g. `telemetry/<device_id>`.
    pub topic: String,

    /// Identifier of the publishing device.
    pub device_id: String,

    /// The telemetry snapshot.
    pub record: TelemetryRecord,
}

impl BrokerFrame {
    /// Builds a publish frame for one record.
    pub fn publish(topic: impl Into<String>, record: TelemetryRecord) -> Self {
        let device_id = record.device_id.clone();
        BrokerFrame::Publish(PublishPayload {
            topic: topic.into(),
            device_id,
            record,
        })
    }

    /// Serializes the frame to its JSON wire form.
    pub fn to_json(&self) -> UplinkResult<String> {
        serde_json::to_string(self).map_err(UplinkError::from)
    }

    /// Parses a frame from its JSON wire form.
    pub fn from_json(json: &str) -> UplinkResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| UplinkError::DeserializationFailed(e.to_string()))
    }

    /// Returns the frame type name for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            BrokerFrame::Publish(_) => "Publish",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::ReadingGenerator;

    #[test]
    fn test_publish_frame_wire_format() {
        let record = ReadingGenerator::new("device-3", "1.0.0").generate();
        let frame = BrokerFrame::publish("telemetry/device-3", record);

        let json = frame.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "Publish");
        assert_eq!(value["payload"]["topic"], "telemetry/device-3");
        assert_eq!(value["payload"]["device_id"], "device-3");
    }

    #[test]
    fn test_frame_round_trip() {
        let record = ReadingGenerator::new("device-3", "1.0.0").generate();
        let frame = BrokerFrame::publish("telemetry/device-3", record.clone());

        let json = frame.to_json().unwrap();
        let BrokerFrame::Publish(payload) = BrokerFrame::from_json(&json).unwrap();
        assert_eq!(payload.record, record);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(BrokerFrame::from_json("{ nope").is_err());
    }
}
