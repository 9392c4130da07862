//! LMDB-backed cache driver.
//!
//! Uses the heed crate (Rust bindings for LMDB) as the shared key-value
//! store: several processes can open the same environment and see each
//! other's entries.
//!
//! # Value Layout
//!
//! `[written_at: 8 bytes, i64 millis LE][envelope json]`
//!
//! Expiry compares `written_at` to the current wall clock.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The driver uses:
//! - Read transactions for lookups
//! - Write transactions for `write`, `clear`, and expiry purges
//! - Statistics are tracked with atomic counters

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tessera_core::{CacheError, TesseraResult};

use super::entry::{decode_entry, encode_entry, CacheEntry};
use super::key::KeyPolicy;
use super::traits::{CacheDriver, CacheStats, StatsRecorder};

const TIMESTAMP_LEN: usize = 8;
const BYTES_PER_MB: usize = 1024 * 1024;

/// LMDB map size for a limit in megabytes, `None` if it overflows `usize`.
pub(crate) fn map_size_bytes(max_size_mb: usize) -> Option<usize> {
    max_size_mb.checked_mul(BYTES_PER_MB)
}

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Size limit does not fit in the address space.
    #[error("Map size of {0} MB overflows")]
    MapSize(usize),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for tessera_core::TesseraError {
    fn from(e: LmdbCacheError) -> Self {
        CacheError::Backend {
            driver: "lmdb".to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

fn txn_error(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// Split a stored value into its write time and envelope.
fn split_value(bytes: &[u8]) -> Option<(DateTime<Utc>, CacheEntry)> {
    if bytes.len() < TIMESTAMP_LEN {
        return None;
    }
    let timestamp_bytes: [u8; TIMESTAMP_LEN] = bytes[..TIMESTAMP_LEN].try_into().ok()?;
    let written_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp_bytes))?;
    let envelope = std::str::from_utf8(&bytes[TIMESTAMP_LEN..]).ok()?;
    Some((written_at, decode_entry(envelope)?))
}

fn age_since(written_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - written_at).to_std().unwrap_or(Duration::ZERO)
}

/// Expired or undecodable at `now`.
fn is_stale(bytes: &[u8], now: DateTime<Utc>) -> bool {
    match split_value(bytes) {
        Some((written_at, entry)) => entry.is_expired(age_since(written_at, now)),
        None => true,
    }
}

/// Shared LMDB cache.
///
/// # Example
///
/// ```ignore
/// use tessera_storage::cache::{CacheDriver, KeyPolicy, LmdbDriver};
///
/// let driver = LmdbDriver::new("/tmp/tessera-cache", 64, KeyPolicy::new("tessera_")?)?;
/// driver.write("tessera_price_signs", "[]", Duration::from_secs(300))?;
/// ```
pub struct LmdbDriver {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
    keys: KeyPolicy,
    stats: StatsRecorder,
}

impl LmdbDriver {
    /// Open (or create) an LMDB cache.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    /// * `keys` - Key rules for this cache namespace
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` overflows when converted to bytes
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        keys: KeyPolicy,
    ) -> Result<Self, LmdbCacheError> {
        let map_size = map_size_bytes(max_size_mb).ok_or(LmdbCacheError::MapSize(max_size_mb))?;
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self {
            env,
            db,
            keys,
            stats: StatsRecorder::default(),
        })
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub fn entry_count(&self) -> TesseraResult<u64> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let count = self.db.len(&rtxn).map_err(txn_error)?;
        Ok(count)
    }

    fn delete(&self, key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let deleted = self.db.delete(&mut wtxn, key).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    /// Delete `key` only if the value is still stale inside the write
    /// transaction. A write committed after the read keeps its value.
    fn delete_if_stale(&self, key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let stale = match self.db.get(&wtxn, key).map_err(txn_error)? {
            Some(value) => is_stale(value, Utc::now()),
            None => false,
        };
        let deleted = stale && self.db.delete(&mut wtxn, key).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    /// Delete every key in this namespace whose value `select` accepts.
    ///
    /// Selection and deletion share one write transaction, so no concurrent
    /// write can slip in between them.
    fn sweep<F>(&self, mut select: F) -> Result<u64, LmdbCacheError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let prefix = self.keys.prefix().as_bytes();
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;

        let mut keys = Vec::new();
        for result in self.db.iter(&wtxn).map_err(txn_error)? {
            let (key, value) = result.map_err(txn_error)?;
            if key.starts_with(prefix) && select(value) {
                keys.push(key.to_vec());
            }
        }

        let mut deleted = 0u64;
        for key in &keys {
            if self.db.delete(&mut wtxn, key).map_err(txn_error)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_error)?;
        Ok(deleted)
    }

    /// Remove every entry in this driver's key namespace.
    pub fn clear_namespace(&self) -> TesseraResult<u64> {
        let deleted = self.sweep(|_| true)?;
        tracing::debug!(prefix = self.keys.prefix(), deleted, "Cleared LMDB cache namespace");
        Ok(deleted)
    }
}

impl std::fmt::Debug for LmdbDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbDriver")
            .field("path", &self.env.path())
            .field("prefix", &self.keys.prefix())
            .finish()
    }
}

impl CacheDriver for LmdbDriver {
    fn name(&self) -> &'static str {
        "lmdb"
    }

    fn read(&self, key: &str) -> TesseraResult<Option<String>> {
        self.keys.validate(key)?;

        // The read transaction must be gone before any purge opens a write one.
        let stored = {
            let rtxn = self.env.read_txn().map_err(txn_error)?;
            self.db
                .get(&rtxn, key.as_bytes())
                .map_err(txn_error)?
                .map(|bytes| bytes.to_vec())
        };

        let Some(bytes) = stored else {
            self.stats.miss();
            return Ok(None);
        };

        let Some((written_at, entry)) = split_value(&bytes) else {
            tracing::warn!(key, len = bytes.len(), "Removing undecodable LMDB cache entry");
            self.delete_if_stale(key.as_bytes())?;
            self.stats.miss();
            return Ok(None);
        };

        let age = age_since(written_at, Utc::now());
        if entry.is_expired(age) {
            tracing::debug!(key, ttl = entry.ttl, age_secs = age.as_secs(), "LMDB cache entry expired");
            self.delete_if_stale(key.as_bytes())?;
            self.stats.expired();
            return Ok(None);
        }

        self.stats.hit();
        Ok(Some(entry.data))
    }

    fn write(&self, key: &str, data: &str, ttl: Duration) -> TesseraResult<()> {
        self.keys.validate(key)?;
        let envelope = encode_entry(data, ttl)?;

        let timestamp_bytes = Utc::now().timestamp_millis().to_le_bytes();
        let mut full_bytes = Vec::with_capacity(TIMESTAMP_LEN + envelope.len());
        full_bytes.extend_from_slice(&timestamp_bytes);
        full_bytes.extend_from_slice(envelope.as_bytes());

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), &full_bytes)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;

        self.stats.write();
        Ok(())
    }

    fn clear(&self, key: &str) -> TesseraResult<()> {
        self.keys.validate(key)?;
        self.delete(key.as_bytes())?;
        Ok(())
    }

    fn purge_expired(&self) -> TesseraResult<u64> {
        let now = Utc::now();
        let purged = self.sweep(|value| is_stale(value, now))?;
        if purged > 0 {
            tracing::debug!(purged, "Purged stale LMDB cache entries");
        }
        Ok(purged)
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_driver() -> (LmdbDriver, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let driver = LmdbDriver::new(temp_dir.path(), 10, KeyPolicy::new("prefix-").unwrap())
            .expect("driver creation should succeed");
        (driver, temp_dir)
    }

    fn raw_put(driver: &LmdbDriver, key: &str, bytes: &[u8]) {
        let mut wtxn = driver.env.write_txn().unwrap();
        driver.db.put(&mut wtxn, key.as_bytes(), bytes).unwrap();
        wtxn.commit().unwrap();
    }

    #[test]
    fn test_new_driver() {
        let (driver, _temp_dir) = create_test_driver();
        assert_eq!(driver.entry_count().unwrap(), 0);
        assert_eq!(driver.stats(), CacheStats::default());
    }

    #[test]
    fn test_oversized_map_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = LmdbDriver::new(temp_dir.path(), usize::MAX, KeyPolicy::new("prefix-").unwrap());
        assert!(matches!(result, Err(LmdbCacheError::MapSize(usize::MAX))));
    }

    #[test]
    fn test_write_and_read() {
        let (driver, _temp_dir) = create_test_driver();
        driver
            .write("prefix-abc_123", r#"{"rate":5.0}"#, Duration::from_secs(60))
            .expect("write should succeed");
        let cached = driver.read("prefix-abc_123").expect("read should succeed");
        assert_eq!(cached.as_deref(), Some(r#"{"rate":5.0}"#));
        assert_eq!(driver.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_read_nonexistent() {
        let (driver, _temp_dir) = create_test_driver();
        assert_eq!(driver.read("prefix-nothing").unwrap(), None);
        assert_eq!(driver.stats().misses, 1);
    }

    #[test]
    fn test_clear() {
        let (driver, _temp_dir) = create_test_driver();
        driver.write("prefix-abc", "[]", Duration::ZERO).unwrap();
        driver.clear("prefix-abc").expect("clear should succeed");
        assert_eq!(driver.read("prefix-abc").unwrap(), None);
        driver.clear("prefix-abc").expect("clearing twice is fine");
    }

    #[test]
    fn test_overwrite() {
        let (driver, _temp_dir) = create_test_driver();
        driver.write("prefix-abc", "1", Duration::ZERO).unwrap();
        driver.write("prefix-abc", "2", Duration::ZERO).unwrap();
        assert_eq!(driver.read("prefix-abc").unwrap().as_deref(), Some("2"));
        assert_eq!(driver.entry_count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let (driver, _temp_dir) = create_test_driver();
        assert!(driver.write("prefix-abc!", "1", Duration::ZERO).is_err());
        assert!(driver.read("").is_err());
        assert_eq!(driver.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_expired_entry_is_purged_on_read() {
        let (driver, _temp_dir) = create_test_driver();
        driver
            .write("prefix-short", "x", Duration::from_secs(1))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(driver.read("prefix-short").unwrap(), None);
        assert_eq!(driver.entry_count().unwrap(), 0);
        assert_eq!(driver.stats().expirations, 1);
    }

    #[test]
    fn test_undecodable_values_read_absent() {
        let (driver, _temp_dir) = create_test_driver();
        raw_put(&driver, "prefix-short", b"abc");
        raw_put(&driver, "prefix-junk", b"\x00\x00\x00\x00\x00\x00\x00\x00not json");
        assert_eq!(driver.read("prefix-short").unwrap(), None);
        assert_eq!(driver.read("prefix-junk").unwrap(), None);
        assert_eq!(driver.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_purge_expired_sweeps_namespace() {
        let (driver, _temp_dir) = create_test_driver();
        driver.write("prefix-keep", "x", Duration::ZERO).unwrap();
        driver
            .write("prefix-gone", "x", Duration::from_secs(1))
            .unwrap();
        raw_put(&driver, "prefix-junk", b"xx");
        raw_put(&driver, "other-junk", b"xx");
        std::thread::sleep(Duration::from_millis(1100));

        assert_eq!(driver.purge_expired().unwrap(), 2);
        assert_eq!(driver.read("prefix-keep").unwrap().as_deref(), Some("x"));
        assert_eq!(driver.entry_count().unwrap(), 2);
    }

    #[test]
    fn test_stale_delete_spares_a_newer_write() {
        let (driver, _temp_dir) = create_test_driver();
        driver
            .write("prefix-race", "old", Duration::from_secs(1))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        // A fresh write commits between the expiry check and the delete.
        driver.write("prefix-race", "fresh", Duration::ZERO).unwrap();
        assert!(!driver.delete_if_stale(b"prefix-race").unwrap());
        assert_eq!(driver.read("prefix-race").unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_concurrent_expiry_keeps_fresh_writes() {
        let (driver, _temp_dir) = create_test_driver();
        let keys: Vec<String> = (0..50).map(|i| format!("prefix-k{}", i)).collect();
        for key in &keys {
            driver.write(key, "old", Duration::from_secs(1)).unwrap();
        }
        std::thread::sleep(Duration::from_millis(1100));

        for key in &keys {
            let barrier = std::sync::Barrier::new(2);
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    driver.read(key).unwrap();
                });
                scope.spawn(|| {
                    barrier.wait();
                    driver.write(key, "fresh", Duration::ZERO).unwrap();
                });
            });
            assert_eq!(driver.read(key).unwrap().as_deref(), Some("fresh"), "{}", key);
        }
    }

    #[test]
    fn test_clear_namespace_leaves_other_prefixes() {
        let (driver, _temp_dir) = create_test_driver();
        driver.write("prefix-a", "1", Duration::ZERO).unwrap();
        driver.write("prefix-b", "2", Duration::ZERO).unwrap();
        raw_put(&driver, "other-c", b"3");

        assert_eq!(driver.clear_namespace().unwrap(), 2);
        assert_eq!(driver.entry_count().unwrap(), 1);
    }
}
