//! TTL cache layer for converted models.
//!
//! Drivers ([`CacheDriver`]) are string-keyed stores with expiry. They wrap
//! every payload in a small envelope (see [`entry`]) and validate keys
//! against a namespace prefix (see [`key`]) before touching storage.
//! [`TypedCache`] sits on top and binds a key to one model type, flattening
//! on write and rebuilding through the structural converter on read.
//!
//! # Example
//!
//! ```ignore
//! let config = CacheConfig::new().with_driver(DriverKind::File { dir: "/tmp/tessera".into() });
//! let driver = config.open_driver()?;
//! let signs: TypedCache<PriceSign> = TypedCache::from_config(driver, &config, "price_signs")?;
//!
//! signs.write(&collection)?;
//! if let Some(cached) = signs.read_collection()? {
//!     // ...
//! }
//! ```

pub mod config;
pub mod entry;
pub mod file;
pub mod key;
pub mod lmdb_backend;
pub mod memory;
pub mod null;
pub mod repository;
pub mod traits;

pub use config::{CacheConfig, DriverKind};
pub use entry::{decode_entry, encode_entry, CacheEntry};
pub use file::{FileCacheError, FileDriver};
pub use key::{validate_key, KeyPolicy};
pub use lmdb_backend::{LmdbCacheError, LmdbDriver};
pub use memory::MemoryDriver;
pub use null::NullDriver;
pub use repository::TypedCache;
pub use traits::{CacheDriver, CacheStats};
