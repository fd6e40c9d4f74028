//! # Uplink Error Types
//!
//! Error types for uplink operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Uplink Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  SerializationFailed    │ │
//! │  │  InvalidUrl     │  │  Disconnected   │  │  DeserializationFailed  │ │
//! │  │  ConfigLoad     │  │  Timeouts, TLS  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐ │
//! │  │     Cache       │  │               Internal                      │ │
//! │  │                 │  │                                             │ │
//! │  │  Cache(...)     │  │  ChannelClosed                              │ │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  No error here is fatal: the process keeps ticking until an explicit   │
//! │  shutdown signal.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for uplink operations.
pub type UplinkResult<T> = Result<T, UplinkError>;

/// Uplink error type covering all possible uplink failures.
#[derive(Debug, Error)]
pub enum UplinkError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid uplink configuration.
    #[error("Invalid uplink configuration: {0}")]
    InvalidConfig(String),

    /// Invalid broker URL.
    #[error("Invalid broker URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Failed to establish the broker connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The broker link dropped unexpectedly.
    #[error("Disconnected from broker")]
    Disconnected,

    /// A publish was attempted while the link was down.
    #[error("Not connected to broker")]
    NotConnected,

    /// Connection timeout.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// A publish outcome did not arrive in time.
    #[error("Publish timed out after {0} seconds")]
    PublishTimeout(u64),

    /// TLS/SSL error.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Failed to serialize a frame.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize a frame.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Cache Errors
    // =========================================================================
    /// Cache persistence failure (non-fatal, memory stays authoritative).
    #[error(transparent)]
    Cache(#[from] beacon_cache::CacheError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A component channel closed unexpectedly.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for UplinkError {
    fn from(err: serde_json::Error) -> Self {
        UplinkError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for UplinkError {
    fn from(err: url::ParseError) -> Self {
        UplinkError::InvalidUrl(err.to_string())
    }
}

impl From<native_tls::Error> for UplinkError {
    fn from(err: native_tls::Error) -> Self {
        UplinkError::TlsError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for UplinkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed => UplinkError::Disconnected,
            WsError::AlreadyClosed => UplinkError::Disconnected,
            WsError::Protocol(p) => UplinkError::WebSocketError(p.to_string()),
            WsError::Io(io) => UplinkError::ConnectionFailed(io.to_string()),
            WsError::Tls(tls) => UplinkError::TlsError(tls.to_string()),
            other => UplinkError::WebSocketError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for UplinkError {
    fn from(err: std::io::Error) -> Self {
        UplinkError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for UplinkError {
    fn from(err: toml::de::Error) -> Self {
        UplinkError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for UplinkError {
    fn from(err: toml::ser::Error) -> Self {
        UplinkError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl UplinkError {
    /// Returns true if this error is transient and the record should go to
    /// the cache rather than be dropped.
    ///
    /// ## Retryable Errors
    /// - Connection failures (network issues)
    /// - Timeouts and dropped links
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Serialization problems (a record that cannot serialize now will
    ///   not serialize later either)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UplinkError::ConnectionFailed(_)
                | UplinkError::Disconnected
                | UplinkError::NotConnected
                | UplinkError::Timeout(_)
                | UplinkError::PublishTimeout(_)
                | UplinkError::WebSocketError(_)
                | UplinkError::ChannelClosed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            UplinkError::InvalidConfig(_)
                | UplinkError::InvalidUrl(_)
                | UplinkError::ConfigLoadFailed(_)
                | UplinkError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(UplinkError::ConnectionFailed("network error".into()).is_retryable());
        assert!(UplinkError::Disconnected.is_retryable());
        assert!(UplinkError::NotConnected.is_retryable());
        assert!(UplinkError::PublishTimeout(10).is_retryable());

        assert!(!UplinkError::InvalidConfig("bad config".into()).is_retryable());
        assert!(!UplinkError::SerializationFailed("bad json".into()).is_retryable());
    }

    #[test]
    fn test_config_errors() {
        assert!(UplinkError::InvalidUrl("not-a-url".into()).is_config_error());
        assert!(!UplinkError::Disconnected.is_config_error());
    }
}
