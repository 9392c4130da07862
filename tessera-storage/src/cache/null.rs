//! Driver that stores nothing.

use std::time::Duration;

use tessera_core::TesseraResult;

use super::key::KeyPolicy;
use super::traits::{CacheDriver, CacheStats, StatsRecorder};

/// Accepts every write and always reads back as absent. Keys are still
/// validated, so a misconfigured key surfaces even with caching off.
#[derive(Debug)]
pub struct NullDriver {
    keys: KeyPolicy,
    stats: StatsRecorder,
}

impl NullDriver {
    pub fn new(keys: KeyPolicy) -> Self {
        Self {
            keys,
            stats: StatsRecorder::default(),
        }
    }
}

impl CacheDriver for NullDriver {
    fn name(&self) -> &'static str {
        "null"
    }

    fn read(&self, key: &str) -> TesseraResult<Option<String>> {
        self.keys.validate(key)?;
        self.stats.miss();
        Ok(None)
    }

    fn write(&self, key: &str, _data: &str, _ttl: Duration) -> TesseraResult<()> {
        self.keys.validate(key)?;
        self.stats.write();
        Ok(())
    }

    fn clear(&self, key: &str) -> TesseraResult<()> {
        self.keys.validate(key)
    }

    fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }
}
