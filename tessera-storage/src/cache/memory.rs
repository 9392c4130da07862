//! In-process cache driver.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tessera_core::{CacheError, TesseraError, TesseraResult};

use super::entry::{decode_entry, encode_entry};
use super::key::KeyPolicy;
use super::traits::{CacheDriver, CacheStats, StatsRecorder};

struct Slot {
    written_at: Instant,
    envelope: String,
}

impl Slot {
    fn is_stale(&self) -> bool {
        match decode_entry(&self.envelope) {
            Some(entry) => entry.is_expired(self.written_at.elapsed()),
            None => true,
        }
    }
}

fn poisoned() -> TesseraError {
    CacheError::Backend {
        driver: "memory".to_string(),
        reason: "lock poisoned".to_string(),
    }
    .into()
}

/// Process-local map of envelopes, timed with a monotonic clock.
pub struct MemoryDriver {
    keys: KeyPolicy,
    slots: RwLock<HashMap<String, Slot>>,
    stats: StatsRecorder,
}

impl MemoryDriver {
    pub fn new(keys: KeyPolicy) -> Self {
        Self {
            keys,
            slots: RwLock::new(HashMap::new()),
            stats: StatsRecorder::default(),
        }
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub fn len(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge(&self, key: &str) -> TesseraResult<()> {
        self.slots.write().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }

    /// Remove `key` only if the slot is still stale under the write lock.
    /// A write that landed after the read keeps its slot.
    fn purge_if_stale(&self, key: &str) -> TesseraResult<()> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        if slots.get(key).is_some_and(Slot::is_stale) {
            slots.remove(key);
        }
        Ok(())
    }

    #[cfg(test)]
    fn insert_raw(&self, key: &str, envelope: &str) {
        self.slots.write().unwrap().insert(
            key.to_string(),
            Slot {
                written_at: Instant::now(),
                envelope: envelope.to_string(),
            },
        );
    }
}

impl std::fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("prefix", &self.keys.prefix())
            .field("entries", &self.len())
            .finish()
    }
}

impl CacheDriver for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str) -> TesseraResult<Option<String>> {
        self.keys.validate(key)?;

        let (age, entry) = {
            let slots = self.slots.read().map_err(|_| poisoned())?;
            match slots.get(key) {
                Some(slot) => (slot.written_at.elapsed(), decode_entry(&slot.envelope)),
                None => {
                    self.stats.miss();
                    return Ok(None);
                }
            }
        };

        let Some(entry) = entry else {
            tracing::warn!(key, "Dropping undecodable memory cache entry");
            self.purge_if_stale(key)?;
            self.stats.miss();
            return Ok(None);
        };

        if entry.is_expired(age) {
            tracing::debug!(key, ttl = entry.ttl, "Memory cache entry expired");
            self.purge_if_stale(key)?;
            self.stats.expired();
            return Ok(None);
        }

        self.stats.hit();
        Ok(Some(entry.data))
    }

    fn write(&self, key: &str, data: &str, ttl: Duration) -> TesseraResult<()> {
        self.keys.validate(key)?;
        let envelope = encode_entry(data, ttl)?;
        self.slots.write().map_err(|_| poisoned())?.insert(
            key.to_string(),
            Slot {
                written_at: Instant::now(),
                envelope,
            },
        );
        self.stats.write();
        Ok(())
    }

    fn clear(&self, key: &str) -> TesseraResult<()> {
        self.keys.validate(key)?;
        self.purge(key)
    }

    fn purge_expired(&self) -> TesseraResult<u64> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_stale());
        let purged = (before - slots.len()) as u64;
        if purged > 0 {
            tracing::debug!(purged, "Purged stale memory cache entries");
        }
        Ok(purged)
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
