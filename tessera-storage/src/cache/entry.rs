//! Cache entry envelope.
//!
//! Drivers never store a payload bare. Every value is wrapped as
//! `{"data": "<payload text>", "ttl": <seconds>}` so that a read can tell
//! our own entries apart from foreign or damaged content. A TTL of zero
//! means the entry never expires.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tessera_core::{CacheError, TesseraResult};

/// Decoded cache envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Serialized payload, passed back to the caller untouched.
    pub data: String,
    /// Lifetime in whole seconds, 0 for no expiry.
    pub ttl: u64,
}

impl CacheEntry {
    pub fn new(data: impl Into<String>, ttl: Duration) -> Self {
        Self {
            data: data.into(),
            ttl: ttl_seconds(ttl),
        }
    }

    /// Lifetime as a duration, `None` when the entry never expires.
    pub fn lifetime(&self) -> Option<Duration> {
        (self.ttl > 0).then(|| Duration::from_secs(self.ttl))
    }

    /// True once `age` has reached the entry's lifetime.
    pub fn is_expired(&self, age: Duration) -> bool {
        match self.lifetime() {
            Some(lifetime) => age >= lifetime,
            None => false,
        }
    }
}

/// Whole seconds for a TTL, rounding any fraction up so that a sub-second
/// TTL does not collapse into "never expires".
pub fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)
}

/// Wrap `data` in the envelope and serialize it.
pub fn encode_entry(data: &str, ttl: Duration) -> TesseraResult<String> {
    serde_json::to_string(&CacheEntry::new(data, ttl)).map_err(|e| {
        CacheError::Backend {
            driver: "envelope".to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Parse raw driver content back into an envelope.
///
/// Anything that is not a JSON object with a non-negative integer `ttl`
/// yields `None` and is treated by drivers as a miss. A non-string `data`
/// member is kept as its JSON text.
pub fn decode_entry(raw: &str) -> Option<CacheEntry> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Discarding undecodable cache envelope");
            return None;
        }
    };
    let object = parsed.as_object()?;
    let ttl = object.get("ttl")?.as_u64()?;
    let data = match object.get("data") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Some(CacheEntry { data, ttl })
}
