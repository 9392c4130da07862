//! Cache configuration and driver construction.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_core::{ConfigError, TesseraResult};

use super::file::FileDriver;
use super::key::KeyPolicy;
use super::lmdb_backend::{map_size_bytes, LmdbDriver};
use super::memory::MemoryDriver;
use super::null::NullDriver;
use super::traits::CacheDriver;

/// Which storage backs the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverKind {
    /// Caching disabled; every read is a miss.
    Null,
    /// Process-local map.
    Memory,
    /// One file per key under `dir`.
    File { dir: PathBuf },
    /// Shared LMDB environment at `path`.
    Lmdb { path: PathBuf, max_size_mb: usize },
}

/// Configuration for the cache layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Namespace prefix every cache key must start with.
    pub key_prefix: String,
    /// TTL used by repositories built from this config, 0 for no expiry.
    pub default_ttl_secs: u64,
    /// Backing driver.
    pub driver: DriverKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: "tessera_".to_string(),
            default_ttl_secs: 3600, // 1 hour
            driver: DriverKind::Memory,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key namespace prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the default TTL. Sub-second remainders round up.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = super::entry::ttl_seconds(ttl);
        self
    }

    /// Set the backing driver.
    pub fn with_driver(mut self, driver: DriverKind) -> Self {
        self.driver = driver;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Check the configuration without opening anything.
    pub fn validate(&self) -> TesseraResult<()> {
        self.key_policy()?;
        match &self.driver {
            DriverKind::File { dir } if dir.as_os_str().is_empty() => {
                Err(ConfigError::MissingRequired {
                    field: "driver.dir".to_string(),
                }
                .into())
            }
            DriverKind::Lmdb { path, .. } if path.as_os_str().is_empty() => {
                Err(ConfigError::MissingRequired {
                    field: "driver.path".to_string(),
                }
                .into())
            }
            DriverKind::Lmdb { max_size_mb, .. } if *max_size_mb == 0 => {
                Err(ConfigError::InvalidValue {
                    field: "driver.max_size_mb".to_string(),
                    value: max_size_mb.to_string(),
                    reason: "must be at least 1".to_string(),
                }
                .into())
            }
            DriverKind::Lmdb { max_size_mb, .. } if map_size_bytes(*max_size_mb).is_none() => {
                Err(ConfigError::InvalidValue {
                    field: "driver.max_size_mb".to_string(),
                    value: max_size_mb.to_string(),
                    reason: "overflows when converted to bytes".to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Key rules for this configuration's namespace.
    pub fn key_policy(&self) -> TesseraResult<KeyPolicy> {
        KeyPolicy::new(self.key_prefix.clone())
    }

    /// Validate the configuration and open the configured driver.
    pub fn open_driver(&self) -> TesseraResult<Arc<dyn CacheDriver>> {
        self.validate()?;
        let keys = self.key_policy()?;
        let driver: Arc<dyn CacheDriver> = match &self.driver {
            DriverKind::Null => Arc::new(NullDriver::new(keys)),
            DriverKind::Memory => Arc::new(MemoryDriver::new(keys)),
            DriverKind::File { dir } => Arc::new(FileDriver::new(dir, keys)?),
            DriverKind::Lmdb { path, max_size_mb } => {
                Arc::new(LmdbDriver::new(path, *max_size_mb, keys)?)
            }
        };
        tracing::debug!(
            driver = driver.name(),
            prefix = %self.key_prefix,
            default_ttl_secs = self.default_ttl_secs,
            "Opened cache driver"
        );
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tessera_core::TesseraError;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::new();
        assert_eq!(config.key_prefix, "tessera_");
        assert_eq!(config.default_ttl(), Duration::from_secs(3600));
        assert_eq!(config.driver, DriverKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::new()
            .with_prefix("shop-")
            .with_ttl(Duration::from_millis(1500))
            .with_driver(DriverKind::Null);
        assert_eq!(config.key_prefix, "shop-");
        assert_eq!(config.default_ttl_secs, 2);
        assert_eq!(config.open_driver().unwrap().name(), "null");
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            CacheConfig::new().with_prefix("bad prefix").validate(),
            Err(TesseraError::Config(ConfigError::InvalidValue { .. }))
        ));
        assert!(matches!(
            CacheConfig::new()
                .with_driver(DriverKind::File { dir: PathBuf::new() })
                .validate(),
            Err(TesseraError::Config(ConfigError::MissingRequired { .. }))
        ));
        assert!(CacheConfig::new()
            .with_driver(DriverKind::Lmdb {
                path: PathBuf::from("/tmp/x"),
                max_size_mb: 0,
            })
            .validate()
            .is_err());
        assert!(matches!(
            CacheConfig::new()
                .with_driver(DriverKind::Lmdb {
                    path: PathBuf::from("/tmp/x"),
                    max_size_mb: usize::MAX,
                })
                .open_driver(),
            Err(TesseraError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_open_each_driver() {
        let temp = TempDir::new().unwrap();
        let kinds = vec![
            (DriverKind::Null, "null"),
            (DriverKind::Memory, "memory"),
            (
                DriverKind::File {
                    dir: temp.path().join("files"),
                },
                "file",
            ),
            (
                DriverKind::Lmdb {
                    path: temp.path().join("lmdb"),
                    max_size_mb: 10,
                },
                "lmdb",
            ),
        ];
        for (kind, name) in kinds {
            let driver = CacheConfig::new().with_driver(kind).open_driver().unwrap();
            assert_eq!(driver.name(), name);
        }
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CacheConfig = serde_json::from_str(
            r#"{"driver": {"kind": "file", "dir": "/var/cache/tessera"}}"#,
        )
        .unwrap();
        assert_eq!(config.key_prefix, "tessera_");
        assert_eq!(
            config.driver,
            DriverKind::File {
                dir: PathBuf::from("/var/cache/tessera")
            }
        );

        let config: CacheConfig = serde_json::from_str(r#"{"default_ttl_secs": 0}"#).unwrap();
        assert_eq!(config.default_ttl(), Duration::ZERO);
    }
}
