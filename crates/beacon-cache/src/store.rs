//! # Cache Store
//!
//! File-backed FIFO queue of telemetry records awaiting delivery.
//!
//! ## The Write-Then-Confirm Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cache Store Guarantees                              │
//! │                                                                         │
//! │  append(record)                                                        │
//! │    1. push onto the in-memory sequence                                 │
//! │    2. rewrite the ENTIRE persisted file                                │
//! │    3. only then is the operation complete                              │
//! │                                                                         │
//! │  drain_all()                                                           │
//! │    1. take every record (insertion order preserved)                    │
//! │    2. rewrite the persisted file as an empty array                     │
//! │    3. return the snapshot                                              │
//! │                                                                         │
//! │  FAILURE SEMANTICS                                                     │
//! │  ─────────────────                                                     │
//! │  • disk write fails → logged, in-memory sequence stays authoritative   │
//! │  • file absent at startup → empty sequence, not an error               │
//! │  • file malformed at startup → logged, empty sequence, not a crash     │
//! │                                                                         │
//! │  The priority is "never silently lose a record acknowledged as         │
//! │  cached", not write efficiency.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use beacon_core::TelemetryRecord;

use crate::error::{CacheError, CacheResult};

// =============================================================================
// Cache Store
// =============================================================================

/// Durable FIFO store for undelivered telemetry records.
///
/// The in-memory sequence is the source of truth for the running process;
/// the backing file is a single JSON array overwritten in full on every
/// mutation.
#[derive(Debug)]
pub struct CacheStore {
    /// Path of the backing file.
    path: PathBuf,

    /// In-memory pending sequence, oldest first.
    records: Vec<TelemetryRecord>,
}

impl CacheStore {
    /// Opens the store, loading any persisted records.
    ///
    /// An absent file yields an empty sequence. A malformed file is logged
    /// and treated as recoverable data loss, also yielding an empty
    /// sequence. The parent directory is created if missing so later
    /// persists have somewhere to write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(?parent, error = %e, "Failed to create cache directory");
            }
        }

        let records = Self::load(&path);
        if !records.is_empty() {
            info!(count = records.len(), ?path, "Restored pending records from cache file");
        }

        CacheStore { path, records }
    }

    /// Reads the persisted sequence from disk.
    fn load(path: &Path) -> Vec<TelemetryRecord> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "No cache file found, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(?path, error = %e, "Failed to read cache file, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                warn!(?path, error = %e, "Cache file is malformed, discarding contents");
                Vec::new()
            }
        }
    }

    /// Appends a record and persists the entire updated sequence before
    /// returning.
    ///
    /// A persist failure is logged and returned for bookkeeping, but the
    /// record is retained in memory either way.
    pub fn append(&mut self, record: TelemetryRecord) -> CacheResult<()> {
        self.records.push(record);
        debug!(pending = self.records.len(), "Record appended to cache");

        self.persist().map_err(|e| {
            warn!(error = %e, "Cache persist failed on append, keeping record in memory");
            e
        })
    }

    /// Atomically removes and returns every cached record in insertion
    /// order, then persists the now-empty sequence.
    ///
    /// A persist failure after the drain is logged; the drained snapshot is
    /// returned regardless.
    pub fn drain_all(&mut self) -> Vec<TelemetryRecord> {
        let drained = std::mem::take(&mut self.records);

        if !drained.is_empty() {
            debug!(count = drained.len(), "Drained cache");
        }

        if let Err(e) = self.persist() {
            warn!(error = %e, "Cache persist failed after drain");
        }

        drained
    }

    /// Rewrites the backing file with the current in-memory sequence.
    ///
    /// Used internally after every mutation and once more by the shutdown
    /// flush, which retries the write even if earlier persists failed.
    pub fn persist(&self) -> CacheResult<()> {
        let contents = serde_json::to_string_pretty(&self.records)?;

        std::fs::write(&self.path, contents).map_err(|source| CacheError::PersistFailed {
            path: self.path.clone(),
            source,
        })
    }

    /// Number of pending records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records are pending.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::ReadingGenerator;

    fn record(n: u32) -> TelemetryRecord {
        let mut r = ReadingGenerator::new(format!("device-{n}"), "1.0.0").generate();
        // Tag the id so ordering assertions are unambiguous.
        r.id = format!("record-{n}");
        r
    }

    #[test]
    fn test_open_absent_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path().join("pending.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");
        std::fs::write(&path, "{ not json at all").unwrap();

        let store = CacheStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_then_drain_preserves_fifo_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path().join("pending.json"));

        for n in 0..5 {
            store.append(record(n)).unwrap();
        }

        let drained = store.drain_all();
        let ids: Vec<_> = drained.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["record-0", "record-1", "record-2", "record-3", "record-4"]);
    }

    #[test]
    fn test_drain_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CacheStore::open(dir.path().join("pending.json"));

        store.append(record(1)).unwrap();
        store.append(record(2)).unwrap();

        assert_eq!(store.drain_all().len(), 2);
        assert!(store.drain_all().is_empty());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");

        {
            let mut store = CacheStore::open(&path);
            store.append(record(1)).unwrap();
            store.append(record(2)).unwrap();
        }

        let mut reopened = CacheStore::open(&path);
        assert_eq!(reopened.len(), 2);

        let ids: Vec<_> = reopened.drain_all().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["record-1", "record-2"]);
    }

    #[test]
    fn test_drain_persists_empty_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.json");

        let mut store = CacheStore::open(&path);
        store.append(record(1)).unwrap();
        store.drain_all();

        let reopened = CacheStore::open(&path);
        assert!(reopened.is_empty());
    }

    #[test]
    fn test_failed_persist_keeps_record_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("missing");
        let path = sub.join("pending.json");

        let mut store = CacheStore::open(&path);
        // Knock the directory out from under the store so writes fail.
        std::fs::remove_dir_all(&sub).unwrap();

        assert!(store.append(record(1)).is_err());
        assert!(store.append(record(2)).is_err());

        // The in-memory sequence is still authoritative.
        assert_eq!(store.len(), 2);
        let ids: Vec<_> = store.drain_all().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["record-1", "record-2"]);
    }

    #[test]
    fn test_persist_recovers_after_directory_returns() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("missing");
        let path = sub.join("pending.json");

        let mut store = CacheStore::open(&path);
        std::fs::remove_dir_all(&sub).unwrap();

        assert!(store.append(record(1)).is_err());
        assert!(store.append(record(2)).is_err());

        // Storage comes back; a forced persist (the shutdown path) succeeds
        // and writes both records.
        std::fs::create_dir_all(&sub).unwrap();
        store.persist().unwrap();

        let reopened = CacheStore::open(&path);
        assert_eq!(reopened.len(), 2);
    }
}
