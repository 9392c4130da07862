//! File-backed cache driver.
//!
//! One file per key under a cache directory. The file's modification time
//! is the write timestamp used for expiry. Writes go through a temp file in
//! the same directory and are renamed into place, so readers never observe
//! a half-written envelope and a cache file is never modified in place.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use tessera_core::{CacheError, TesseraResult};

use super::entry::{decode_entry, encode_entry};
use super::key::KeyPolicy;
use super::traits::{CacheDriver, CacheStats, StatsRecorder};

/// Error type for file cache operations.
#[derive(Debug, thiserror::Error)]
pub enum FileCacheError {
    /// Failed to create or read the cache directory.
    #[error("Cache directory {path} unusable: {reason}")]
    Directory { path: String, reason: String },

    /// Failed to move a finished temp file into place.
    #[error("Failed to persist cache file: {0}")]
    Persist(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FileCacheError> for tessera_core::TesseraError {
    fn from(e: FileCacheError) -> Self {
        CacheError::Backend {
            driver: "file".to_string(),
            reason: e.to_string(),
        }
        .into()
    }
}

/// Envelopes stored as `<dir>/<key>.json`.
#[derive(Debug)]
pub struct FileDriver {
    keys: KeyPolicy,
    dir: PathBuf,
    stats: StatsRecorder,
}

impl FileDriver {
    /// Create a driver rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P, keys: KeyPolicy) -> Result<Self, FileCacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| FileCacheError::Directory {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            keys,
            dir,
            stats: StatsRecorder::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // Keys are restricted to [A-Za-z0-9_-], so they are safe as file names.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn remove(&self, path: &Path) -> Result<(), FileCacheError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a cache file's content and write time from one handle.
    /// Returns `None` when the file is absent.
    fn snapshot(path: &Path) -> Result<Option<Snapshot>, FileCacheError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = file.metadata()?.modified()?;
        let mut raw = String::new();
        if let Err(e) = file.read_to_string(&mut raw) {
            // Not UTF-8: treat like any other foreign content.
            if e.kind() != ErrorKind::InvalidData {
                return Err(e.into());
            }
            raw.clear();
        }
        Ok(Some(Snapshot { raw, modified }))
    }

    /// Remove `path` only if it still holds the file that was observed.
    ///
    /// The file is first renamed onto a temp path in the cache directory.
    /// If it turns out to be a newer write, it is linked back unless an
    /// even newer write already took its place.
    fn evict_if_unchanged(&self, path: &Path, observed: &Snapshot) -> Result<bool, FileCacheError> {
        let tomb = NamedTempFile::new_in(&self.dir)?.into_temp_path();
        match fs::rename(path, &tomb) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }

        let taken = Self::snapshot(&tomb)?;
        if taken.as_ref() == Some(observed) {
            tomb.close()?;
            return Ok(true);
        }

        match fs::hard_link(&tomb, path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
        tomb.close()?;
        Ok(false)
    }

    /// Whether an observed file is expired or undecodable.
    fn is_stale(observed: &Snapshot) -> bool {
        match decode_entry(&observed.raw) {
            Some(entry) => entry.is_expired(age_since(observed.modified)),
            None => true,
        }
    }
}

/// Content and write time of one cache file.
#[derive(Debug, PartialEq, Eq)]
struct Snapshot {
    raw: String,
    modified: SystemTime,
}

fn age_since(modified: SystemTime) -> Duration {
    // A clock set backwards makes the entry look brand new.
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}

impl CacheDriver for FileDriver {
    fn name(&self) -> &'static str {
        "file"
    }

    fn read(&self, key: &str) -> TesseraResult<Option<String>> {
        self.keys.validate(key)?;
        let path = self.path_for(key);

        let Some(observed) = Self::snapshot(&path)? else {
            self.stats.miss();
            return Ok(None);
        };

        let Some(entry) = decode_entry(&observed.raw) else {
            tracing::warn!(key, path = %path.display(), "Removing undecodable cache file");
            self.evict_if_unchanged(&path, &observed)?;
            self.stats.miss();
            return Ok(None);
        };

        let age = age_since(observed.modified);
        if entry.is_expired(age) {
            tracing::debug!(key, ttl = entry.ttl, age_secs = age.as_secs(), "Cache file expired");
            self.evict_if_unchanged(&path, &observed)?;
            self.stats.expired();
            return Ok(None);
        }

        self.stats.hit();
        Ok(Some(entry.data))
    }

    fn write(&self, key: &str, data: &str, ttl: Duration) -> TesseraResult<()> {
        self.keys.validate(key)?;
        let envelope = encode_entry(data, ttl)?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(FileCacheError::from)?;
        temp.write_all(envelope.as_bytes())
            .map_err(FileCacheError::from)?;
        temp.as_file().sync_all().map_err(FileCacheError::from)?;
        temp.persist(self.path_for(key))
            .map_err(|e| FileCacheError::Persist(e.error.to_string()))?;

        self.stats.write();
        Ok(())
    }

    fn clear(&self, key: &str) -> TesseraResult<()> {
        self.keys.validate(key)?;
        self.remove(&self.path_for(key))?;
        Ok(())
    }

    fn purge_expired(&self) -> TesseraResult<u64> {
        let mut purged = 0u64;
        for dir_entry in fs::read_dir(&self.dir).map_err(FileCacheError::from)? {
            let path = dir_entry.map_err(FileCacheError::from)?.path();
            let Some(key) = cache_key_of(&path) else {
                continue;
            };
            if self.keys.validate(key).is_err() {
                continue;
            }
            let Some(observed) = Self::snapshot(&path)? else {
                continue;
            };
            if Self::is_stale(&observed) && self.evict_if_unchanged(&path, &observed)? {
                purged += 1;
            }
        }
        if purged > 0 {
            tracing::debug!(purged, dir = %self.dir.display(), "Purged stale cache files");
        }
        Ok(purged)
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}

/// The cache key a `<key>.json` path stands for.
fn cache_key_of(path: &Path) -> Option<&str> {
    if path.extension()? != "json" {
        return None;
    }
    path.file_stem()?.to_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_driver() -> (FileDriver, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let driver = FileDriver::new(temp_dir.path(), KeyPolicy::new("prefix-").unwrap())
            .expect("Failed to create driver");
        (driver, temp_dir)
    }

    #[test]
    fn test_write_then_read() {
        let (driver, _temp) = create_test_driver();
        driver
            .write("prefix-abc_123", "[1,2,3]", Duration::from_secs(60))
            .unwrap();
        assert_eq!(
            driver.read("prefix-abc_123").unwrap().as_deref(),
            Some("[1,2,3]")
        );
        assert!(driver.dir().join("prefix-abc_123.json").exists());
    }

    #[test]
    fn test_overwrite_replaces_payload() {
        let (driver, _temp) = create_test_driver();
        driver.write("prefix-abc", "1", Duration::ZERO).unwrap();
        driver.write("prefix-abc", "2", Duration::ZERO).unwrap();
        assert_eq!(driver.read("prefix-abc").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (driver, _temp) = create_test_driver();
        driver.write("prefix-abc", "1", Duration::ZERO).unwrap();
        driver.clear("prefix-abc").unwrap();
        driver.clear("prefix-abc").unwrap();
        assert_eq!(driver.read("prefix-abc").unwrap(), None);
    }

    #[test]
    fn test_invalid_key_touches_nothing() {
        let (driver, temp) = create_test_driver();
        assert!(driver.write("prefix-abc!", "1", Duration::ZERO).is_err());
        assert!(driver.write("no-prefix", "1", Duration::ZERO).is_err());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_expired_file_is_removed() {
        let (driver, _temp) = create_test_driver();
        driver
            .write("prefix-short", "x", Duration::from_secs(1))
            .unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(driver.read("prefix-short").unwrap(), None);
        assert!(!driver.dir().join("prefix-short.json").exists());
        assert_eq!(driver.stats().expirations, 1);
    }

    #[test]
    fn test_eviction_spares_a_newer_write() {
        let (driver, _temp) = create_test_driver();
        driver
            .write("prefix-race", "old", Duration::from_secs(1))
            .unwrap();
        let path = driver.path_for("prefix-race");
        let observed = FileDriver::snapshot(&path).unwrap().unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        assert!(FileDriver::is_stale(&observed));

        // A fresh write lands between the expiry check and the removal.
        driver.write("prefix-race", "fresh", Duration::ZERO).unwrap();
        assert!(!driver.evict_if_unchanged(&path, &observed).unwrap());
        assert_eq!(driver.read("prefix-race").unwrap().as_deref(), Some("fresh"));
        // Only the cache file remains; the temp path is gone.
        assert_eq!(fs::read_dir(driver.dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_purge_expired_sweeps_directory() {
        let (driver, _temp) = create_test_driver();
        driver.write("prefix-keep", "x", Duration::ZERO).unwrap();
        driver
            .write("prefix-gone", "x", Duration::from_secs(1))
            .unwrap();
        fs::write(driver.dir().join("prefix-junk.json"), "garbage").unwrap();
        fs::write(driver.dir().join("notes.txt"), "unrelated").unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert_eq!(driver.purge_expired().unwrap(), 2);
        assert!(driver.dir().join("prefix-keep.json").exists());
        assert!(driver.dir().join("notes.txt").exists());
        assert!(!driver.dir().join("prefix-gone.json").exists());
    }

    #[test]
    fn test_foreign_file_reads_absent() {
        let (driver, _temp) = create_test_driver();
        fs::write(driver.dir().join("prefix-foreign.json"), "garbage").unwrap();
        assert_eq!(driver.read("prefix-foreign").unwrap(), None);
        assert!(!driver.dir().join("prefix-foreign.json").exists());
    }
}
