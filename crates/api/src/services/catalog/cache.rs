//! Cache-aside reads in front of the product store.
//!
//! Keys:
//!
//! - `all_products` - the full list, as returned by `ProductStore::find_all`
//! - `product:{slug}` - a single product
//!
//! Entries are JSON snapshots with a fixed TTL. The cache is never
//! authoritative: any cache failure, and any entry that fails to decode, is
//! logged and treated as a miss. Absent slugs are never cached.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::CatalogError;
use crate::cache::KeyValueCache;
use crate::db::ProductStore;
use crate::models::Product;

/// Key of the cached full product list.
pub const ALL_PRODUCTS_KEY: &str = "all_products";

/// Key of a cached single product.
#[must_use]
pub fn product_key(slug: &str) -> String {
    format!("product:{slug}")
}

/// Read-through product cache.
#[derive(Clone)]
pub struct ProductCache {
    cache: Arc<dyn KeyValueCache>,
    store: Arc<dyn ProductStore>,
    ttl: Duration,
}

impl ProductCache {
    /// Create a product cache writing entries with `ttl`.
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>, store: Arc<dyn ProductStore>, ttl: Duration) -> Self {
        Self { cache, store, ttl }
    }

    /// All products, from cache if present, else from the store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store read fails.
    pub async fn get_all(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(products) = self.read::<Vec<Product>>(ALL_PRODUCTS_KEY).await {
            tracing::debug!(key = ALL_PRODUCTS_KEY, "cache hit");
            return Ok(products);
        }

        tracing::debug!(key = ALL_PRODUCTS_KEY, "cache miss");
        let products = self.store.find_all().await?;
        self.write(ALL_PRODUCTS_KEY, &products).await;

        Ok(products)
    }

    /// One product by slug, from cache if present, else from the store.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the store has no such slug.
    /// Returns `CatalogError::Repository` if the store read fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Product, CatalogError> {
        let key = product_key(slug);

        if let Some(product) = self.read::<Product>(&key).await {
            tracing::debug!(key = %key, "cache hit");
            return Ok(product);
        }

        tracing::debug!(key = %key, "cache miss");
        let product = self
            .store
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| CatalogError::not_found(slug))?;
        self.write(&key, &product).await;

        Ok(product)
    }

    /// Drop the cached entry for one slug.
    pub async fn invalidate(&self, slug: &str) {
        self.delete(&product_key(slug)).await;
    }

    /// Drop the cached full product list.
    pub async fn invalidate_all(&self) {
        self.delete(ALL_PRODUCTS_KEY).await;
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.cache.get(key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self.cache.set(key, bytes, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }

    async fn delete(&self, key: &str) {
        if let Err(e) = self.cache.delete(key).await {
            tracing::warn!(key = %key, error = %e, "cache invalidation failed");
        }
    }
}

impl std::fmt::Debug for ProductCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use finvise_core::Price;

    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::MemoryProductStore;
    use crate::models::NewProduct;

    async fn setup() -> (ProductCache, MemoryCache, MemoryProductStore) {
        let cache = MemoryCache::new(100);
        let store = MemoryProductStore::new();
        store
            .insert(&NewProduct {
                name: "Chili Oil".to_owned(),
                slug: "chili-oil".to_owned(),
                description: "Crunchy".to_owned(),
                price: Price::from_minor_units(1299).unwrap(),
                image: "https://cdn.example.com/chili.png".to_owned(),
            })
            .await
            .unwrap();

        let products = ProductCache::new(
            Arc::new(cache.clone()),
            Arc::new(store.clone()),
            Duration::from_secs(3600),
        );
        (products, cache, store)
    }

    #[test]
    fn test_keys() {
        assert_eq!(ALL_PRODUCTS_KEY, "all_products");
        assert_eq!(product_key("chili-oil"), "product:chili-oil");
    }

    #[tokio::test]
    async fn test_get_by_slug_populates_cache() {
        let (products, cache, _) = setup().await;

        let product = products.get_by_slug("chili-oil").await.unwrap();
        let cached = cache.get("product:chili-oil").await.unwrap().unwrap();
        let decoded: Product = serde_json::from_slice(&cached).unwrap();

        assert_eq!(decoded, product);
    }

    #[tokio::test]
    async fn test_missing_slug_is_not_cached() {
        let (products, cache, _) = setup().await;

        let err = products.get_by_slug("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Product with slug nope not found");
        assert!(cache.get("product:nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let (products, cache, _) = setup().await;
        cache
            .set(ALL_PRODUCTS_KEY, b"{not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let all = products.get_all().await.unwrap();
        assert_eq!(all.len(), 1);

        // Overwritten with a good snapshot
        let cached = cache.get(ALL_PRODUCTS_KEY).await.unwrap().unwrap();
        let decoded: Vec<Product> = serde_json::from_slice(&cached).unwrap();
        assert_eq!(decoded, all);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (products, cache, _) = setup().await;
        products.get_all().await.unwrap();
        products.get_by_slug("chili-oil").await.unwrap();

        products.invalidate("chili-oil").await;
        assert!(cache.get("product:chili-oil").await.unwrap().is_none());
        assert!(cache.get(ALL_PRODUCTS_KEY).await.unwrap().is_some());

        products.invalidate_all().await;
        assert!(cache.get(ALL_PRODUCTS_KEY).await.unwrap().is_none());
    }
}
