//! Integration tests for the Finvise commerce backend.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory tests
//! cargo test -p finvise-integration-tests
//!
//! # PostgreSQL-backed tests
//! TEST_DATABASE_URL=postgres://localhost/finvise_test \
//!     cargo test -p finvise-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `sessions` - register, login, logout and identify
//! - `catalog` - product CRUD and cache-aside behaviour
//! - `postgres` - the same flows against a real database

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use finvise_api::cache::{CacheError, KeyValueCache, MemoryCache};
use finvise_api::db::{MemoryProductStore, MemoryUserStore, ProductStore, RepositoryError};
use finvise_api::models::{NewProduct, Product, ProductPatch};
use finvise_api::services::auth::{CredentialHasher, TokenCodec, TokenDuration};
use finvise_api::services::catalog::ProductCache;
use finvise_api::services::{CatalogService, SessionService};
use finvise_core::Price;

/// Signing secret used by every test codec.
pub const TEST_JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

/// Cache TTL used by test catalogs.
pub const TEST_CACHE_TTL: Duration = Duration::from_secs(60);

/// Argon2 hasher with minimal cost parameters.
#[must_use]
pub fn fast_hasher() -> CredentialHasher {
    let params = argon2::Params::new(8, 1, 1, None).expect("valid argon2 params");
    CredentialHasher::with_params(params)
}

/// Token codec over [`TEST_JWT_SECRET`].
#[must_use]
pub fn test_codec(lifetime: TokenDuration) -> TokenCodec {
    TokenCodec::new(&SecretString::from(TEST_JWT_SECRET), lifetime)
}

/// Session service over a fresh in-memory user store.
#[must_use]
pub fn session_service() -> (SessionService, MemoryUserStore) {
    let users = MemoryUserStore::new();
    let sessions = SessionService::new(
        Arc::new(users.clone()),
        fast_hasher(),
        test_codec(TokenDuration::OneHour),
    );
    (sessions, users)
}

/// Catalog service over the given store and cache.
#[must_use]
pub fn catalog_service(
    store: Arc<dyn ProductStore>,
    cache: Arc<dyn KeyValueCache>,
) -> CatalogService {
    let products = ProductCache::new(cache, Arc::clone(&store), TEST_CACHE_TTL);
    CatalogService::new(products, store)
}

/// Catalog service over a counting in-memory store and an in-memory cache.
#[must_use]
pub fn counted_catalog() -> (CatalogService, CountingProductStore, MemoryCache) {
    let store = CountingProductStore::default();
    let cache = MemoryCache::new(1_000);
    let catalog = catalog_service(Arc::new(store.clone()), Arc::new(cache.clone()));
    (catalog, store, cache)
}

/// A valid product with the given slug.
#[must_use]
pub fn sample_product(slug: &str) -> NewProduct {
    NewProduct {
        name: format!("Product {slug}"),
        slug: slug.to_owned(),
        description: format!("Description of {slug}"),
        price: Price::from_minor_units(1_299).expect("positive price"),
        image: format!("https://cdn.example.com/{slug}.png"),
    }
}

/// [`MemoryProductStore`] wrapper that counts reads and updates.
#[derive(Debug, Clone, Default)]
pub struct CountingProductStore {
    inner: MemoryProductStore,
    find_all_calls: Arc<AtomicUsize>,
    find_by_slug_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl CountingProductStore {
    /// Number of `find_all` calls so far.
    #[must_use]
    pub fn find_all_calls(&self) -> usize {
        self.find_all_calls.load(Ordering::SeqCst)
    }

    /// Number of `find_by_slug` calls so far.
    #[must_use]
    pub fn find_by_slug_calls(&self) -> usize {
        self.find_by_slug_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_by_slug` calls so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Total store reads so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.find_all_calls() + self.find_by_slug_calls()
    }
}

#[async_trait]
impl ProductStore for CountingProductStore {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all().await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        self.find_by_slug_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_slug(slug).await
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        self.inner.insert(product).await
    }

    async fn update_by_slug(
        &self,
        slug: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update_by_slug(slug, patch).await
    }

    async fn delete_by_slug(&self, slug: &str) -> Result<bool, RepositoryError> {
        self.inner.delete_by_slug(slug).await
    }
}

/// Cache whose every operation fails, as an unreachable Redis would.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingCache;

#[async_trait]
impl KeyValueCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_owned()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_owned()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_owned()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_owned()))
    }
}
