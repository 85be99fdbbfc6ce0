//! Application state shared across handlers.

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;

use crate::cache::{KeyValueCache, MemoryCache, RedisCache};
use crate::config::{AppConfig, CacheConfig, SessionConfig};
use crate::db::{self, PgProductStore, PgUserStore, ProductStore, UserStore};
use crate::services::auth::{CredentialHasher, SessionService, TokenCodec};
use crate::services::catalog::{CatalogService, ProductCache};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Backend reachability, as reported by [`AppState::readiness`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub database: bool,
    pub cache: bool,
}

impl Readiness {
    /// Whether every backend answered.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.database && self.cache
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// session and catalog services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    sessions: SessionService,
    catalog: CatalogService,
    cache: Arc<dyn KeyValueCache>,
    pool: Option<PgPool>,
}

impl AppState {
    /// Connect to `PostgreSQL` and the configured cache and build the services.
    ///
    /// Without a `REDIS_URL`, or if the Redis pool cannot be built, the
    /// in-process cache is used.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Database` if the database pool cannot be created.
    pub async fn connect(config: &AppConfig) -> Result<Self, StateError> {
        let pool = db::create_pool(&config.database_url).await?;
        let cache = select_cache(config);

        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
        let products: Arc<dyn ProductStore> = Arc::new(PgProductStore::new(pool.clone()));

        Ok(Self::build(
            users,
            products,
            cache,
            &config.session,
            config.cache,
            Some(pool),
        ))
    }

    /// Build the state over arbitrary stores and cache.
    #[must_use]
    pub fn from_parts(
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        cache: Arc<dyn KeyValueCache>,
        session: &SessionConfig,
        cache_config: CacheConfig,
    ) -> Self {
        Self::build(users, products, cache, session, cache_config, None)
    }

    fn build(
        users: Arc<dyn UserStore>,
        products: Arc<dyn ProductStore>,
        cache: Arc<dyn KeyValueCache>,
        session: &SessionConfig,
        cache_config: CacheConfig,
        pool: Option<PgPool>,
    ) -> Self {
        let tokens = TokenCodec::new(&session.jwt_secret, session.token_duration);
        let sessions = SessionService::new(users, CredentialHasher::new(), tokens);

        let product_cache =
            ProductCache::new(Arc::clone(&cache), Arc::clone(&products), cache_config.ttl);
        let catalog = CatalogService::new(product_cache, products);

        Self {
            inner: Arc::new(AppStateInner {
                sessions,
                catalog,
                cache,
                pool,
            }),
        }
    }

    /// Get a reference to the session service.
    #[must_use]
    pub fn sessions(&self) -> &SessionService {
        &self.inner.sessions
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get the database pool, if the state was built by [`AppState::connect`].
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Probe the database and cache.
    pub async fn readiness(&self) -> Readiness {
        let database = match &self.inner.pool {
            Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "database readiness check failed");
                    false
                }
            },
            None => true,
        };

        let cache = match self.inner.cache.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "cache readiness check failed");
                false
            }
        };

        Readiness { database, cache }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.inner.sessions)
            .field("catalog", &self.inner.catalog)
            .field("postgres", &self.inner.pool.is_some())
            .finish_non_exhaustive()
    }
}

fn select_cache(config: &AppConfig) -> Arc<dyn KeyValueCache> {
    let Some(url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set, using in-process product cache");
        return Arc::new(MemoryCache::new(config.cache.max_entries));
    };

    match RedisCache::connect(url) {
        Ok(cache) => {
            tracing::info!("using Redis product cache");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-process cache."
            );
            Arc::new(MemoryCache::new(config.cache.max_entries))
        }
    }
}
