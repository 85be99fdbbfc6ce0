//! Key-value cache backends.
//!
//! The product read path talks to a [`KeyValueCache`]: opaque bytes under
//! string keys with a per-entry TTL. Two backends ship with the crate:
//!
//! - [`RedisCache`] - shared across processes via `deadpool-redis`
//! - [`MemoryCache`] - in-process `moka` cache, used when no Redis URL is set
//!
//! Callers treat every [`CacheError`] as a miss (reads) or a no-op (writes).

mod memory;
mod redis_backend;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryCache;
pub use redis_backend::RedisCache;

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No connection could be checked out of the pool.
    #[error("cache pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// The pool could not be built from the configured URL.
    #[error("cache configuration error: {0}")]
    Config(#[from] deadpool_redis::CreatePoolError),

    /// A command failed on an established connection.
    #[error("cache command error: {0}")]
    Command(#[from] redis::RedisError),

    /// The backend is unavailable for some other reason.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Byte-oriented cache with per-entry expiry.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Fetch the bytes stored under `key`, if present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached.
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
