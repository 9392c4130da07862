//! Tessera Storage - Cache Drivers and Typed Repositories
//!
//! Persists converted models between requests. A [`CacheDriver`] stores
//! JSON text under validated keys with a TTL; a [`TypedCache`] binds one
//! key to one model type and hands back `M` or `Collection<M>` on read.

pub mod cache;

pub use cache::{
    decode_entry, encode_entry, validate_key, CacheConfig, CacheDriver, CacheEntry, CacheStats,
    DriverKind, FileCacheError, FileDriver, KeyPolicy, LmdbCacheError, LmdbDriver, MemoryDriver,
    NullDriver, TypedCache,
};
