//! Cache key rules.
//!
//! A cache key is a fixed namespace prefix followed by a non-empty suffix,
//! and the whole key is drawn from `[A-Za-z0-9_-]`. Keys are checked before
//! any driver touches storage, which also makes them safe to use verbatim
//! as file names and LMDB keys.

use once_cell::sync::Lazy;
use regex::Regex;
use tessera_core::{CacheError, ConfigError, TesseraResult};

static KEY_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid cache key regex"));

/// Returns true if `text` only uses the key character set.
pub fn is_key_charset(text: &str) -> bool {
    KEY_CHARSET.is_match(text)
}

fn rejected(key: &str, reason: impl Into<String>) -> tessera_core::TesseraError {
    CacheError::KeyValidation {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

/// Validate `key` against the namespace `prefix`.
///
/// # Errors
/// Returns `CacheError::KeyValidation` if the key is empty, lacks the
/// prefix, has nothing after the prefix, or uses characters outside
/// `[A-Za-z0-9_-]`.
pub fn validate_key(key: &str, prefix: &str) -> TesseraResult<()> {
    if key.is_empty() {
        return Err(rejected(key, "key is empty"));
    }
    if !key.starts_with(prefix) {
        return Err(rejected(key, format!("missing namespace prefix {:?}", prefix)));
    }
    if key.len() == prefix.len() {
        return Err(rejected(key, "nothing after the namespace prefix"));
    }
    if !is_key_charset(key) {
        return Err(rejected(key, "characters outside [A-Za-z0-9_-]"));
    }
    Ok(())
}

/// Key rules bound to one namespace prefix, shared by a driver and the
/// repositories writing through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPolicy {
    prefix: String,
}

impl KeyPolicy {
    /// Create a policy for `prefix`.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the prefix is empty or uses
    /// characters outside the key character set.
    pub fn new(prefix: impl Into<String>) -> TesseraResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() || !is_key_charset(&prefix) {
            return Err(ConfigError::InvalidValue {
                field: "key_prefix".to_string(),
                value: prefix,
                reason: "must be non-empty and match [A-Za-z0-9_-]".to_string(),
            }
            .into());
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Validate a full key.
    pub fn validate(&self, key: &str) -> TesseraResult<()> {
        validate_key(key, &self.prefix)
    }

    /// Build and validate `prefix + suffix`.
    pub fn key(&self, suffix: &str) -> TesseraResult<String> {
        let key = format!("{}{}", self.prefix, suffix);
        self.validate(&key)?;
        Ok(key)
    }
}
