//! Typed cache repository.
//!
//! Binds one cache key to one model type. Writes flatten the value deeply
//! and store it as JSON text; reads run the stored text back through the
//! structural converter so callers get `M` or `Collection<M>` again.

use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tessera_core::{
    convert_auto, CacheError, Collection, Converted, Flatten, Model, TesseraError, TesseraResult,
};

use super::config::CacheConfig;
use super::traits::CacheDriver;

/// Cache of `M` (or `Collection<M>`) under a single key.
pub struct TypedCache<M: Model + 'static> {
    driver: Arc<dyn CacheDriver>,
    key: String,
    ttl: Duration,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model + 'static> Clone for TypedCache<M> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            key: self.key.clone(),
            ttl: self.ttl,
            _model: PhantomData,
        }
    }
}

impl<M: Model + 'static> std::fmt::Debug for TypedCache<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("model", &M::TYPE_NAME)
            .field("driver", &self.driver.name())
            .field("key", &self.key)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl<M: Model + 'static> TypedCache<M> {
    /// Bind `key` on `driver`. The key is validated by the driver on every
    /// operation, not here.
    pub fn new(driver: Arc<dyn CacheDriver>, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            driver,
            key: key.into(),
            ttl,
            _model: PhantomData,
        }
    }

    /// Build from configuration: the key is `key_prefix + suffix` and the
    /// TTL is the configured default.
    pub fn from_config(
        driver: Arc<dyn CacheDriver>,
        config: &CacheConfig,
        suffix: &str,
    ) -> TesseraResult<Self> {
        let key = config.key_policy()?.key(suffix)?;
        Ok(Self::new(driver, key, config.default_ttl()))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn expected() -> String {
        format!("{} or Collection<{}>", M::TYPE_NAME, M::TYPE_NAME)
    }

    fn corrupt(&self, reason: impl Into<String>) -> TesseraError {
        CacheError::Corrupt {
            key: self.key.clone(),
            reason: reason.into(),
        }
        .into()
    }

    /// Store `value` under this repository's key.
    ///
    /// # Errors
    /// `CacheError::TypeMismatch` if `value` is neither `M` nor a
    /// collection of `M`. Driver errors (key validation included) pass
    /// through unchanged.
    pub fn write<V: Flatten + Any>(&self, value: &V) -> TesseraResult<()> {
        let any = value as &dyn Any;
        if !(any.is::<M>() || any.is::<Collection<M>>() || any.is::<Converted<M>>()) {
            tracing::warn!(
                key = %self.key,
                expected = M::TYPE_NAME,
                actual = type_name::<V>(),
                "Refusing to cache value of the wrong type"
            );
            return Err(CacheError::TypeMismatch {
                expected: Self::expected(),
                actual: type_name::<V>().to_string(),
            }
            .into());
        }

        let payload = value.to_value();
        let text = serde_json::to_string(&payload).map_err(|e| CacheError::Backend {
            driver: self.driver.name().to_string(),
            reason: e.to_string(),
        })?;
        self.driver.write(&self.key, &text, self.ttl)?;
        tracing::debug!(
            key = %self.key,
            driver = self.driver.name(),
            bytes = text.len(),
            ttl_secs = self.ttl.as_secs(),
            "Cached {}",
            M::TYPE_NAME
        );
        Ok(())
    }

    /// Read the cached value back.
    ///
    /// Absent, expired and empty-sequence entries read as `None`.
    ///
    /// # Errors
    /// `CacheError::Corrupt` if the stored text is not JSON. Conversion and
    /// validation errors from rebuilding `M` propagate as-is.
    pub fn read(&self) -> TesseraResult<Option<Converted<M>>> {
        let Some(raw) = self.driver.read(&self.key)? else {
            tracing::debug!(key = %self.key, driver = self.driver.name(), "Cache miss");
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(key = %self.key, error = %e, "Cached payload is not valid JSON");
            self.corrupt(e.to_string())
        })?;

        if matches!(&value, Value::Array(items) if items.is_empty()) {
            tracing::debug!(key = %self.key, "Cached empty sequence treated as absent");
            return Ok(None);
        }

        convert_auto::<M>(&value).map(Some)
    }

    /// Read a single cached model.
    ///
    /// # Errors
    /// `CacheError::TypeMismatch` if a collection is stored under the key.
    pub fn read_model(&self) -> TesseraResult<Option<M>> {
        match self.read()? {
            None => Ok(None),
            Some(Converted::Model(model)) => Ok(Some(model)),
            Some(Converted::Collection(_)) => Err(CacheError::TypeMismatch {
                expected: M::TYPE_NAME.to_string(),
                actual: format!("Collection<{}>", M::TYPE_NAME),
            }
            .into()),
        }
    }

    /// Read a cached collection.
    ///
    /// # Errors
    /// `CacheError::TypeMismatch` if a single model is stored under the key.
    pub fn read_collection(&self) -> TesseraResult<Option<Collection<M>>> {
        match self.read()? {
            None => Ok(None),
            Some(Converted::Collection(collection)) => Ok(Some(collection)),
            Some(Converted::Model(_)) => Err(CacheError::TypeMismatch {
                expected: format!("Collection<{}>", M::TYPE_NAME),
                actual: M::TYPE_NAME.to_string(),
            }
            .into()),
        }
    }

    /// Return the cached value, or convert and cache whatever `fetch`
    /// produces on a miss.
    pub fn read_or_fetch<F>(&self, fetch: F) -> TesseraResult<Converted<M>>
    where
        F: FnOnce() -> TesseraResult<Value>,
    {
        if let Some(cached) = self.read()? {
            return Ok(cached);
        }
        let converted = convert_auto::<M>(&fetch()?)?;
        self.write(&converted)?;
        Ok(converted)
    }

    /// Remove the entry.
    pub fn clear(&self) -> TesseraResult<()> {
        self.driver.clear(&self.key)?;
        tracing::debug!(key = %self.key, driver = self.driver.name(), "Cache entry cleared");
        Ok(())
    }
}
