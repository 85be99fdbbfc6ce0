//! Redis cache backed by a `deadpool-redis` pool.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use secrecy::{ExposeSecret, SecretString};

use super::{CacheError, KeyValueCache};

/// How long a caller waits for a pooled connection before giving up.
const POOL_WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared [`KeyValueCache`] in Redis.
///
/// Connections are established lazily; an unreachable server surfaces as
/// `CacheError::Pool` on first use rather than at construction.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    /// Build a connection pool for the given Redis URL.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Config` if the URL cannot be turned into a pool.
    pub fn connect(url: &SecretString) -> Result<Self, CacheError> {
        let mut config = Config::from_url(url.expose_secret());
        // `from_url` leaves `pool` unset, which means no timeouts at all
        config.pool = Some(PoolConfig {
            timeouts: Timeouts {
                wait: Some(POOL_WAIT_TIMEOUT),
                create: Some(POOL_WAIT_TIMEOUT),
                recycle: Some(POOL_WAIT_TIMEOUT),
            },
            ..PoolConfig::default()
        });

        let pool = config.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("RedisCache")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.pool.get().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        // SET EX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);
        let () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
