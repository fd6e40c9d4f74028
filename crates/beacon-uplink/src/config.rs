//! # Uplink Configuration
//!
//! Configuration management for the simulator.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. TOML Config File                                                   │
//! │     ~/.config/beacon/beacon.toml (Linux)                               │
//! │     ~/Library/Application Support/io.beacon.edge/beacon.toml (macOS)   │
//! │                                                                         │
//! │  2. Default Values                                                     │
//! │     generated device_id, 10s tick, local broker                        │
//! │                                                                         │
//! │  The reference design has no CLI flags and no environment-variable     │
//! │  overrides: every constant is compile-time or config-time.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # beacon.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Greenhouse Node 4"
//! firmware = "1.4.2"
//!
//! [broker]
//! url = "wss://broker.local:9001/uplink"
//! topic_prefix = "telemetry"
//! skip_cert_validation = true
//! keep_alive_secs = 60
//! reconnect_interval_ms = 1000
//!
//! [cache]
//! file = "/var/lib/beacon/pending.json"
//!
//! tick_interval_ms = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{UplinkError, UplinkResult};
use crate::transport::TransportConfig;

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of the simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Greenhouse Node 4").
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Firmware version stamped on every record.
    #[serde(default = "default_firmware")]
    pub firmware: String,
}

fn default_device_name() -> String {
    "Beacon Device".to_string()
}

fn default_firmware() -> String {
    "1.0.0".to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
            firmware: default_firmware(),
        }
    }
}

// =============================================================================
// Broker Settings
// =============================================================================

/// Broker connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// WebSocket URL of the broker.
    #[serde(default = "default_broker_url")]
    pub url: String,

    /// Topic prefix; the full topic is `<prefix>/<device_id>`.
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    /// Skip TLS certificate validation.
    /// Lab brokers commonly run with self-signed certificates.
    #[serde(default = "default_true")]
    pub skip_cert_validation: bool,

    /// Keepalive ping interval (seconds).
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Initial reconnect interval (milliseconds); backoff grows from here.
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    /// Maximum backoff between reconnect attempts (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Connection timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long to wait for a publish outcome (seconds).
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_secs: u64,
}

fn default_broker_url() -> String {
    "ws://127.0.0.1:9001/uplink".to_string()
}

fn default_topic_prefix() -> String {
    "telemetry".to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    60
}

fn default_reconnect_interval() -> u64 {
    1000
}

fn default_max_backoff() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_publish_timeout() -> u64 {
    10
}

impl Default for BrokerSettings {
    fn default() -> Self {
        BrokerSettings {
            url: default_broker_url(),
            topic_prefix: default_topic_prefix(),
            skip_cert_validation: true,
            keep_alive_secs: default_keep_alive(),
            reconnect_interval_ms: default_reconnect_interval(),
            max_backoff_secs: default_max_backoff(),
            connect_timeout_secs: default_connect_timeout(),
            publish_timeout_secs: default_publish_timeout(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Durable cache settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Path of the pending-records file.
    /// Defaults to `pending.json` in the platform data directory.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// =============================================================================
// Main Uplink Configuration
// =============================================================================

/// Default tick period: one telemetry snapshot every 10 seconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10_000;

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

/// Complete uplink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    /// Device identity.
    #[serde(default)]
    pub device: DeviceSettings,

    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerSettings,

    /// Durable cache settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Tick period in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        UplinkConfig {
            device: DeviceSettings::default(),
            broker: BrokerSettings::default(),
            cache: CacheSettings::default(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl UplinkConfig {
    /// Loads configuration from file, falling back to defaults.
    pub fn load(config_path: Option<PathBuf>) -> UplinkResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading uplink config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load uplink config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> UplinkResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| UplinkError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Uplink config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> UplinkResult<()> {
        if self.device.id.is_empty() {
            return Err(UplinkError::InvalidConfig("device id must not be empty".into()));
        }

        let url = url::Url::parse(&self.broker.url)?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(UplinkError::InvalidUrl(format!(
                "Broker URL must start with ws:// or wss://, got: {}",
                self.broker.url
            )));
        }

        if self.tick_interval_ms == 0 {
            return Err(UplinkError::InvalidConfig(
                "tick_interval_ms must be greater than 0".into(),
            ));
        }

        if self.broker.reconnect_interval_ms == 0 {
            return Err(UplinkError::InvalidConfig(
                "reconnect_interval_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("io", "beacon", "edge")
            .map(|dirs| dirs.config_dir().join("beacon.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the device ID.
    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    /// Returns the full publish topic for this device.
    pub fn topic(&self) -> String {
        format!("{}/{}", self.broker.topic_prefix, self.device.id)
    }

    /// Returns the tick period as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Resolves the cache file path, falling back to the platform data dir.
    pub fn cache_path(&self) -> PathBuf {
        if let Some(ref file) = self.cache.file {
            return file.clone();
        }

        directories::ProjectDirs::from("io", "beacon", "edge")
            .map(|dirs| dirs.data_dir().join("pending.json"))
            .unwrap_or_else(|| PathBuf::from("pending.json"))
    }

    /// Builds the transport configuration from the broker settings.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.broker.url.clone(),
            skip_cert_validation: self.broker.skip_cert_validation,
            keep_alive: Duration::from_secs(self.broker.keep_alive_secs),
            reconnect_interval: Duration::from_millis(self.broker.reconnect_interval_ms),
            max_backoff: Duration::from_secs(self.broker.max_backoff_secs),
            connect_timeout: Duration::from_secs(self.broker.connect_timeout_secs),
            publish_timeout: Duration::from_secs(self.broker.publish_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UplinkConfig::default();
        assert!(!config.device.id.is_empty()); // Auto-generated
        assert_eq!(config.tick_interval_ms, 10_000);
        assert_eq!(config.broker.keep_alive_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_topic_includes_device_id() {
        let mut config = UplinkConfig::default();
        config.device.id = "dev-9".into();
        assert_eq!(config.topic(), "telemetry/dev-9");
    }

    #[test]
    fn test_config_validation() {
        let mut config = UplinkConfig::default();
        assert!(config.validate().is_ok());

        // Empty device ID should fail
        config.device.id = String::new();
        assert!(config.validate().is_err());

        // Invalid URL scheme should fail
        config.device.id = "test".to_string();
        config.broker.url = "http://broker".to_string();
        assert!(config.validate().is_err());

        // Valid WebSocket URL should pass
        config.broker.url = "wss://broker:9001/uplink".to_string();
        assert!(config.validate().is_ok());

        // Zero tick interval should fail
        config.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = UplinkConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[device]"));
        assert!(toml_str.contains("[broker]"));

        let back: UplinkConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.device.id, config.device.id);
    }

    #[test]
    fn test_transport_config_mapping() {
        let mut config = UplinkConfig::default();
        config.broker.reconnect_interval_ms = 500;
        config.broker.keep_alive_secs = 30;

        let transport = config.transport_config();
        assert_eq!(transport.reconnect_interval, Duration::from_millis(500));
        assert_eq!(transport.keep_alive, Duration::from_secs(30));
    }
}
