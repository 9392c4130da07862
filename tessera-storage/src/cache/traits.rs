//! Cache driver trait and usage statistics.
//!
//! A driver is a string-keyed TTL store. It owns key validation, the entry
//! envelope and expiry; callers only ever see the payload text they wrote.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tessera_core::TesseraResult;

/// Pluggable cache storage.
///
/// Implementations must be thread-safe. Every operation validates the key
/// before touching storage, so an invalid key fails with
/// `CacheError::KeyValidation` and nothing is written.
pub trait CacheDriver: Send + Sync {
    /// Short driver name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Read the payload stored under `key`.
    ///
    /// Returns `None` when the key is absent, expired, or holds content that
    /// is not a valid envelope. Expired entries are purged on the way out.
    fn read(&self, key: &str) -> TesseraResult<Option<String>>;

    /// Store `data` under `key` for `ttl`. A zero TTL never expires.
    fn write(&self, key: &str, data: &str, ttl: Duration) -> TesseraResult<()>;

    /// Remove the entry under `key`. Clearing an absent key is not an error.
    fn clear(&self, key: &str) -> TesseraResult<()>;

    /// Eagerly remove expired and undecodable entries in this driver's
    /// namespace, returning how many were removed.
    ///
    /// Entries overwritten since they went stale are kept.
    fn purge_expired(&self) -> TesseraResult<u64> {
        Ok(0)
    }

    /// Usage counters since the driver was created.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, expired and undecodable entries included.
    pub misses: u64,
    /// Number of successful writes.
    pub writes: u64,
    /// Number of entries purged because their TTL elapsed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lock-free counters shared by the bundled drivers.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    expirations: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// An expired entry counts as a miss as well.
    pub(crate) fn expired(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
        self.miss();
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}
