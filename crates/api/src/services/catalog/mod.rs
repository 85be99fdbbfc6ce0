//! Catalog service.
//!
//! Reads go through the [`ProductCache`]; writes hit the store first and then
//! invalidate the affected cache keys. A reader may briefly see the old value
//! between a store write and its invalidation; staleness is bounded by the
//! cache TTL.

mod cache;
mod error;

pub use cache::{ALL_PRODUCTS_KEY, ProductCache, product_key};
pub use error::CatalogError;

use std::sync::Arc;

use tracing::instrument;
use url::Url;

use crate::db::{ProductStore, RepositoryError};
use crate::models::{NewProduct, Product, ProductPatch};

/// Product catalog reads and writes with cache coherence.
///
/// Cheap to clone; clones share the cache and store.
#[derive(Clone)]
pub struct CatalogService {
    inner: Arc<CatalogServiceInner>,
}

struct CatalogServiceInner {
    products: ProductCache,
    store: Arc<dyn ProductStore>,
}

impl CatalogService {
    /// Create a new catalog service. `products` must read from `store`.
    #[must_use]
    pub fn new(products: ProductCache, store: Arc<dyn ProductStore>) -> Self {
        Self {
            inner: Arc::new(CatalogServiceInner { products, store }),
        }
    }

    /// The read-through cache.
    #[must_use]
    pub fn cache(&self) -> &ProductCache {
        &self.inner.products
    }

    /// All products, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store read fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        self.inner.products.get_all().await
    }

    /// One product by its exact slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has the slug.
    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, CatalogError> {
        self.inner.products.get_by_slug(slug).await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` if a field rule fails.
    /// Returns `CatalogError::SlugTaken` if the slug is in use.
    #[instrument(skip_all, fields(slug = %input.slug))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product, CatalogError> {
        validate_name(&input.name)?;
        validate_slug(&input.slug)?;
        validate_description(&input.description)?;
        validate_image(&input.image)?;

        let product = self
            .inner
            .store
            .insert(&input)
            .await
            .map_err(|e| slug_conflict(e, &input.slug))?;

        self.inner.products.invalidate_all().await;

        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Apply a partial update to the product with this slug.
    ///
    /// An empty patch returns the current product without writing.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has the slug.
    /// Returns `CatalogError::Validation` if a supplied field breaks a rule.
    /// Returns `CatalogError::SlugTaken` if the new slug is in use.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        slug: &str,
        patch: ProductPatch,
    ) -> Result<Product, CatalogError> {
        let existing = self.inner.products.get_by_slug(slug).await?;
        if patch.is_empty() {
            return Ok(existing);
        }

        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(new_slug) = &patch.slug {
            validate_slug(new_slug)?;
        }
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }
        if let Some(image) = &patch.image {
            validate_image(image)?;
        }

        let updated = self
            .inner
            .store
            .update_by_slug(slug, &patch)
            .await
            .map_err(|e| slug_conflict(e, patch.slug.as_deref().unwrap_or(slug)))?
            .ok_or_else(|| CatalogError::not_found(slug))?;

        self.inner.products.invalidate_all().await;
        self.inner.products.invalidate(slug).await;
        if updated.slug != slug {
            self.inner.products.invalidate(&updated.slug).await;
        }

        tracing::info!(product_id = %existing.id, "product updated");
        Ok(updated)
    }

    /// Delete the product with this slug.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has the slug.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, slug: &str) -> Result<(), CatalogError> {
        let existing = self.inner.products.get_by_slug(slug).await?;

        if !self.inner.store.delete_by_slug(slug).await? {
            return Err(CatalogError::not_found(slug));
        }

        self.inner.products.invalidate_all().await;
        self.inner.products.invalidate(slug).await;

        tracing::info!(product_id = %existing.id, "product deleted");
        Ok(())
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("products", &self.inner.products)
            .finish_non_exhaustive()
    }
}

fn slug_conflict(err: RepositoryError, slug: &str) -> CatalogError {
    match err {
        RepositoryError::Conflict(_) => CatalogError::SlugTaken {
            slug: slug.to_owned(),
        },
        other => CatalogError::Repository(other),
    }
}

fn require_non_empty(value: &str, message: &str) -> Result<(), CatalogError> {
    if value.is_empty() {
        return Err(CatalogError::Validation(message.to_owned()));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    require_non_empty(name, "Product name is required")
}

fn validate_slug(slug: &str) -> Result<(), CatalogError> {
    require_non_empty(slug, "Product slug is required")
}

fn validate_description(description: &str) -> Result<(), CatalogError> {
    require_non_empty(description, "Product description is required")
}

fn validate_image(image: &str) -> Result<(), CatalogError> {
    match Url::parse(image) {
        Ok(url) if url.has_host() => Ok(()),
        _ => Err(CatalogError::Validation("Invalid image URL".to_owned())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use finvise_core::Price;

    use super::*;
    use crate::cache::{KeyValueCache, MemoryCache};
    use crate::db::MemoryProductStore;
    use crate::error::ErrorKind;

    fn service() -> (CatalogService, MemoryCache, MemoryProductStore) {
        let cache = MemoryCache::new(100);
        let store = MemoryProductStore::new();
        let products = ProductCache::new(
            Arc::new(cache.clone()),
            Arc::new(store.clone()),
            Duration::from_secs(3600),
        );
        (
            CatalogService::new(products, Arc::new(store.clone())),
            cache,
            store,
        )
    }

    fn new_product(slug: &str) -> NewProduct {
        NewProduct {
            name: "Chili Oil".to_owned(),
            slug: slug.to_owned(),
            description: "Crunchy".to_owned(),
            price: Price::from_minor_units(1299).unwrap(),
            image: "https://cdn.example.com/chili.png".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_create_invalidates_list() {
        let (service, cache, _) = service();
        assert!(service.list_products().await.unwrap().is_empty());
        assert!(cache.get(ALL_PRODUCTS_KEY).await.unwrap().is_some());

        service.create_product(new_product("chili")).await.unwrap();
        assert!(cache.get(ALL_PRODUCTS_KEY).await.unwrap().is_none());
        assert_eq!(service.list_products().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (service, _, store) = service();

        let mut input = new_product("chili");
        input.name = String::new();
        let err = service.create_product(input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "Product name is required");

        let mut input = new_product("chili");
        input.image = "chili.png".to_owned();
        let err = service.create_product(input).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid image URL");

        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_slug() {
        let (service, _, _) = service();
        service.create_product(new_product("chili")).await.unwrap();

        let err = service
            .create_product(new_product("chili"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Product with slug chili already exists");
    }

    #[tokio::test]
    async fn test_update_reflects_patch_on_next_read() {
        let (service, _, _) = service();
        service.create_product(new_product("chili")).await.unwrap();
        service.get_product("chili").await.unwrap();

        let patch = ProductPatch {
            price: Some(Price::from_minor_units(1599).unwrap()),
            ..ProductPatch::default()
        };
        service.update_product("chili", patch).await.unwrap();

        let product = service.get_product("chili").await.unwrap();
        assert_eq!(product.price.minor_units(), 1599);
    }

    #[tokio::test]
    async fn test_slug_rename_invalidates_both_keys() {
        let (service, cache, _) = service();
        service.create_product(new_product("old")).await.unwrap();
        service.get_product("old").await.unwrap();

        let patch = ProductPatch {
            slug: Some("new".to_owned()),
            ..ProductPatch::default()
        };
        let updated = service.update_product("old", patch).await.unwrap();
        assert_eq!(updated.slug, "new");

        assert!(cache.get(&product_key("old")).await.unwrap().is_none());
        assert!(cache.get(&product_key("new")).await.unwrap().is_none());
        assert!(matches!(
            service.get_product("old").await,
            Err(CatalogError::NotFound { .. })
        ));
        assert_eq!(service.get_product("new").await.unwrap().id, updated.id);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (service, _, _) = service();
        let err = service
            .update_product("ghost", ProductPatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, cache, _) = service();
        service.create_product(new_product("chili")).await.unwrap();
        service.list_products().await.unwrap();
        service.get_product("chili").await.unwrap();

        service.delete_product("chili").await.unwrap();

        assert!(cache.get(ALL_PRODUCTS_KEY).await.unwrap().is_none());
        assert!(cache.get(&product_key("chili")).await.unwrap().is_none());
        assert!(service.list_products().await.unwrap().is_empty());
        assert!(matches!(
            service.delete_product("chili").await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[test]
    fn test_image_url_rules() {
        assert!(validate_image("https://cdn.example.com/a.png").is_ok());
        assert!(validate_image("http://localhost:8080/a.png").is_ok());
        assert!(validate_image("/images/a.png").is_err());
        assert!(validate_image("").is_err());
    }
}
