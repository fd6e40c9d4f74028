//! # Cache Error Types
//!
//! Error types for cache persistence. None of these are fatal to the
//! process: the in-memory sequence stays authoritative when the disk write
//! fails, and a corrupt file on load is treated as recoverable data loss.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache error type covering persistence failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Writing the cache file to disk failed.
    #[error("Failed to persist cache to {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the in-memory sequence to JSON failed.
    #[error("Failed to serialize cache contents: {0}")]
    SerializeFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_error_display_includes_path() {
        let err = CacheError::PersistFailed {
            path: PathBuf::from("/var/lib/beacon/pending.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("pending.json"));
    }
}
