//! Seed catalog products from a YAML file.
//!
//! Products are created through the catalog service, so validation and
//! cache invalidation run exactly as for any other write. Products whose slug
//! already exists are skipped, which makes re-running a seed file harmless.
//!
//! # File format
//!
//! ```yaml
//! - name: Chili Oil
//!   slug: chili-oil
//!   description: Crunchy Sichuan chili oil
//!   price: 1299
//!   image: https://cdn.example.com/chili-oil.png
//! ```

use std::path::Path;

use finvise_api::config::AppConfig;
use finvise_api::error::init_sentry;
use finvise_api::models::NewProduct;
use finvise_api::services::{CatalogError, CatalogService};
use finvise_api::state::AppState;

/// Outcome of a seeding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
}

/// Seed products from a YAML file into the configured database.
///
/// # Errors
///
/// Returns an error if configuration is missing, the file cannot be read or
/// parsed, the database is unreachable, or a product fails validation.
pub async fn products(file_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !file_path.exists() {
        return Err(format!("File not found: {}", file_path.display()).into());
    }

    tracing::info!(path = %file_path.display(), "Loading products from file");

    // Parse before connecting so a bad file fails fast
    let content = tokio::fs::read_to_string(file_path).await?;
    let products = parse_products(&content)?;
    tracing::info!(count = products.len(), "Parsed products");

    let config = AppConfig::from_env()?;
    let _sentry = init_sentry(&config);
    let state = AppState::connect(&config).await?;
    tracing::info!("Connected to database");

    let report = seed_products(state.catalog(), products).await?;
    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        "Seeding complete"
    );

    Ok(())
}

/// Parse a YAML list of products.
///
/// # Errors
///
/// Returns `serde_yaml::Error` for malformed YAML, missing fields or a
/// non-positive price.
pub fn parse_products(content: &str) -> Result<Vec<NewProduct>, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Create each product, skipping slugs that already exist.
///
/// # Errors
///
/// Returns the first `CatalogError` other than a slug conflict.
pub async fn seed_products(
    catalog: &CatalogService,
    products: Vec<NewProduct>,
) -> Result<SeedReport, CatalogError> {
    let mut report = SeedReport::default();

    for product in products {
        let slug = product.slug.clone();
        match catalog.create_product(product).await {
            Ok(_) => report.created += 1,
            Err(CatalogError::SlugTaken { .. }) => {
                tracing::warn!(slug = %slug, "Product already exists, skipping");
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use finvise_api::cache::MemoryCache;
    use finvise_api::db::MemoryProductStore;
    use finvise_api::services::catalog::ProductCache;

    use super::*;

    const YAML: &str = r"
- name: Chili Oil
  slug: chili-oil
  description: Crunchy Sichuan chili oil
  price: 1299
  image: https://cdn.example.com/chili-oil.png
- name: Black Vinegar
  slug: black-vinegar
  description: Aged Chinkiang vinegar
  price: 899
  image: https://cdn.example.com/vinegar.png
";

    fn catalog() -> CatalogService {
        let store = Arc::new(MemoryProductStore::new());
        let cache = ProductCache::new(
            Arc::new(MemoryCache::new(100)),
            store.clone(),
            Duration::from_secs(60),
        );
        CatalogService::new(cache, store)
    }

    #[test]
    fn test_parse_products() {
        let products = parse_products(YAML).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].slug, "chili-oil");
        assert_eq!(products[1].price.minor_units(), 899);
    }

    #[test]
    fn test_parse_rejects_non_positive_price() {
        let yaml = YAML.replace("price: 899", "price: 0");
        assert!(parse_products(&yaml).is_err());
    }

    #[tokio::test]
    async fn test_seed_is_rerunnable() {
        let catalog = catalog();

        let first = seed_products(&catalog, parse_products(YAML).unwrap())
            .await
            .unwrap();
        assert_eq!(first, SeedReport { created: 2, skipped: 0 });

        let second = seed_products(&catalog, parse_products(YAML).unwrap())
            .await
            .unwrap();
        assert_eq!(second, SeedReport { created: 0, skipped: 2 });

        assert_eq!(catalog.list_products().await.unwrap().len(), 2);
    }
}
