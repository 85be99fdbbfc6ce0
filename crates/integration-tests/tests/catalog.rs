//! Integration tests for the catalog and its product cache.
//!
//! These run against the in-memory product store and cache and need no
//! external services.

use std::sync::Arc;

use finvise_api::cache::KeyValueCache;
use finvise_api::error::ErrorKind;
use finvise_api::models::ProductPatch;
use finvise_api::services::CatalogError;
use finvise_api::services::catalog::{ALL_PRODUCTS_KEY, product_key};
use finvise_core::Price;
use finvise_integration_tests::{
    CountingProductStore, FailingCache, catalog_service, counted_catalog, sample_product,
};

// ============================================================================
// Cache-aside Reads
// ============================================================================

#[tokio::test]
async fn test_list_reads_store_at_most_once() {
    let (catalog, store, cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    for _ in 0..5 {
        let products = catalog.list_products().await.expect("list products");
        assert_eq!(products.len(), 1);
    }

    assert_eq!(store.find_all_calls(), 1);
    assert!(cache.get(ALL_PRODUCTS_KEY).await.expect("cache get").is_some());
}

#[tokio::test]
async fn test_get_reads_store_at_most_once() {
    let (catalog, store, _cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    for _ in 0..5 {
        let product = catalog.get_product("chili-oil").await.expect("get product");
        assert_eq!(product.slug, "chili-oil");
    }

    assert_eq!(store.find_by_slug_calls(), 1);
}

#[tokio::test]
async fn test_missing_slug_is_not_found_and_not_cached() {
    let (catalog, store, cache) = counted_catalog();

    for _ in 0..2 {
        let err = catalog
            .get_product("nope")
            .await
            .expect_err("missing product");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Product with slug nope not found");
    }

    assert_eq!(store.find_by_slug_calls(), 2);
    assert!(cache.get(&product_key("nope")).await.expect("cache get").is_none());
}

#[tokio::test]
async fn test_cache_outage_falls_back_to_store() {
    let store = CountingProductStore::default();
    let catalog = catalog_service(Arc::new(store.clone()), Arc::new(FailingCache));

    let created = catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create survives cache outage");

    assert_eq!(catalog.list_products().await.expect("list"), vec![created.clone()]);
    assert_eq!(catalog.list_products().await.expect("list"), vec![created.clone()]);
    assert_eq!(catalog.get_product("chili-oil").await.expect("get"), created);

    // Every read goes to the store
    assert_eq!(store.find_all_calls(), 2);
    assert_eq!(store.find_by_slug_calls(), 1);
}

#[tokio::test]
async fn test_corrupt_cache_entry_is_a_miss() {
    let (catalog, store, cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    cache
        .set(
            &product_key("chili-oil"),
            b"not json".to_vec(),
            finvise_integration_tests::TEST_CACHE_TTL,
        )
        .await
        .expect("cache set");

    let product = catalog.get_product("chili-oil").await.expect("get product");
    assert_eq!(product.slug, "chili-oil");
    assert_eq!(store.find_by_slug_calls(), 1);
}

// ============================================================================
// Writes & Invalidation
// ============================================================================

#[tokio::test]
async fn test_create_invalidates_list() {
    let (catalog, store, _cache) = counted_catalog();

    assert!(catalog.list_products().await.expect("list").is_empty());
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    let products = catalog.list_products().await.expect("list");
    assert_eq!(products.len(), 1);
    assert_eq!(store.find_all_calls(), 2);
}

#[tokio::test]
async fn test_update_is_visible_on_next_read() {
    let (catalog, _store, _cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    // Warm both keys
    catalog.list_products().await.expect("list");
    catalog.get_product("chili-oil").await.expect("get");

    let patch = ProductPatch {
        price: Some(Price::from_minor_units(1_599).expect("positive price")),
        ..ProductPatch::default()
    };
    let updated = catalog
        .update_product("chili-oil", patch)
        .await
        .expect("update product");
    assert_eq!(updated.price.minor_units(), 1_599);

    let fetched = catalog.get_product("chili-oil").await.expect("get");
    assert_eq!(fetched.price.minor_units(), 1_599);
    let listed = catalog.list_products().await.expect("list");
    let first = listed.first().expect("one product");
    assert_eq!(first.price.minor_units(), 1_599);
}

#[tokio::test]
async fn test_empty_patch_skips_the_store_write() {
    let (catalog, store, _cache) = counted_catalog();
    let created = catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");

    let unchanged = catalog
        .update_product("chili-oil", ProductPatch::default())
        .await
        .expect("empty update");

    assert_eq!(unchanged, created);
    assert_eq!(store.update_calls(), 0);

    let err = catalog
        .update_product("nope", ProductPatch::default())
        .await
        .expect_err("missing product");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_slug_rename_moves_the_product() {
    let (catalog, _store, cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");
    catalog.get_product("chili-oil").await.expect("warm cache");

    let patch = ProductPatch {
        slug: Some("chili-crisp".to_owned()),
        ..ProductPatch::default()
    };
    catalog
        .update_product("chili-oil", patch)
        .await
        .expect("rename product");

    assert!(cache.get(&product_key("chili-oil")).await.expect("cache get").is_none());
    let err = catalog
        .get_product("chili-oil")
        .await
        .expect_err("old slug gone");
    assert!(matches!(err, CatalogError::NotFound { .. }));
    let renamed = catalog.get_product("chili-crisp").await.expect("new slug");
    assert_eq!(renamed.slug, "chili-crisp");
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let (catalog, _store, _cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");
    catalog
        .create_product(sample_product("vinegar"))
        .await
        .expect("create product");

    let err = catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect_err("duplicate create");
    assert!(matches!(err, CatalogError::SlugTaken { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let patch = ProductPatch {
        slug: Some("chili-oil".to_owned()),
        ..ProductPatch::default()
    };
    let err = catalog
        .update_product("vinegar", patch)
        .await
        .expect_err("rename onto taken slug");
    assert!(matches!(err, CatalogError::SlugTaken { .. }));
}

#[tokio::test]
async fn test_invalid_product_never_reaches_store() {
    let (catalog, store, _cache) = counted_catalog();

    let mut no_name = sample_product("chili-oil");
    no_name.name = String::new();
    let mut bad_image = sample_product("chili-oil");
    bad_image.image = "not a url".to_owned();

    for input in [no_name, bad_image] {
        let err = catalog.create_product(input).await.expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    assert!(catalog.list_products().await.expect("list").is_empty());
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (catalog, _store, _cache) = counted_catalog();
    catalog
        .create_product(sample_product("chili-oil"))
        .await
        .expect("create product");
    catalog.get_product("chili-oil").await.expect("warm cache");
    catalog.list_products().await.expect("warm cache");

    catalog.delete_product("chili-oil").await.expect("delete");

    let err = catalog
        .get_product("chili-oil")
        .await
        .expect_err("deleted product");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(catalog.list_products().await.expect("list").is_empty());

    let err = catalog
        .delete_product("chili-oil")
        .await
        .expect_err("second delete");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
