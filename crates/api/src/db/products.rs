//! Product persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductPatch};

/// Message carried by the conflict raised on a duplicate slug.
pub(crate) const DUPLICATE_SLUG: &str = "slug already in use";

/// Storage of catalog products.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a product by its exact slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a patch to the product with this slug and bump `updated_at`.
    ///
    /// Returns `None` if no product has the slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the patch renames the slug to one
    /// already in use.
    /// Returns `RepositoryError::Database` for other database errors.
    async fn update_by_slug(
        &self,
        slug: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete the product with this slug. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn delete_by_slug(&self, slug: &str) -> Result<bool, RepositoryError>;
}

/// `PostgreSQL`-backed [`ProductStore`].
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    /// Create a new product store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, slug, description, price, image, created_at, updated_at
            FROM products
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, slug, description, price, image, created_at, updated_at
            FROM products
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (name, slug, description, price, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, slug, description, price, image, created_at, updated_at
            ",
        )
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_SLUG))
    }

    async fn update_by_slug(
        &self,
        slug: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                image = COALESCE($6, image),
                updated_at = NOW()
            WHERE slug = $1
            RETURNING id, name, slug, description, price, image, created_at, updated_at
            ",
        )
        .bind(slug)
        .bind(patch.name.as_deref())
        .bind(patch.slug.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.price)
        .bind(patch.image.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_SLUG))
    }

    async fn delete_by_slug(&self, slug: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
