//! In-process stores.
//!
//! Same contract as the `PostgreSQL` stores, uniqueness included. Data lives
//! for the lifetime of the value; clones share the same maps.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use finvise_core::{Email, ProductId, UserId};

use super::RepositoryError;
use super::products::{DUPLICATE_SLUG, ProductStore};
use super::users::{DUPLICATE_EMAIL, UserStore};
use crate::models::{NewProduct, NewUser, Product, ProductPatch, UserRecord};

/// Rows keyed by serial ID, plus the next ID to assign.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory [`UserStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<Table<UserRecord>>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.rows.values().find(|u| &u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.rows.get(&id.as_i32()).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let mut users = self.users.write().await;
        if users.rows.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(DUPLICATE_EMAIL.to_owned()));
        }

        let now = Utc::now();
        let id = users.allocate_id();
        let record = UserRecord {
            id: UserId::new(id),
            name: user.name,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            current_token: None,
            created_at: now,
            updated_at: now,
        };
        users.rows.insert(id, record.clone());

        Ok(record)
    }

    async fn update_current_token(
        &self,
        id: UserId,
        token: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        let record = users
            .rows
            .get_mut(&id.as_i32())
            .ok_or(RepositoryError::NotFound)?;

        record.current_token = token.map(str::to_owned);

        Ok(())
    }
}

/// In-memory [`ProductStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryProductStore {
    products: Arc<RwLock<Table<Product>>>,
}

impl MemoryProductStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.rows.values().cloned().collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.rows.values().find(|p| p.slug == slug).cloned())
    }

    async fn insert(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut products = self.products.write().await;
        if products.rows.values().any(|p| p.slug == product.slug) {
            return Err(RepositoryError::Conflict(DUPLICATE_SLUG.to_owned()));
        }

        let now = Utc::now();
        let id = products.allocate_id();
        let product = Product {
            id: ProductId::new(id),
            name: product.name.clone(),
            slug: product.slug.clone(),
            description: product.description.clone(),
            price: product.price,
            image: product.image.clone(),
            created_at: now,
            updated_at: now,
        };
        products.rows.insert(id, product.clone());

        Ok(product)
    }

    async fn update_by_slug(
        &self,
        slug: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut products = self.products.write().await;

        let Some(id) = products
            .rows
            .iter()
            .find_map(|(id, p)| (p.slug == slug).then_some(*id))
        else {
            return Ok(None);
        };

        if let Some(new_slug) = &patch.slug
            && products
                .rows
                .iter()
                .any(|(other, p)| *other != id && &p.slug == new_slug)
        {
            return Err(RepositoryError::Conflict(DUPLICATE_SLUG.to_owned()));
        }

        let Some(product) = products.rows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            product.name.clone_from(name);
        }
        if let Some(new_slug) = &patch.slug {
            product.slug.clone_from(new_slug);
        }
        if let Some(description) = &patch.description {
            product.description.clone_from(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(image) = &patch.image {
            product.image.clone_from(image);
        }
        product.updated_at = Utc::now();

        Ok(Some(product.clone()))
    }

    async fn delete_by_slug(&self, slug: &str) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        let before = products.rows.len();
        products.rows.retain(|_, p| p.slug != slug);
        Ok(products.rows.len() < before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use finvise_core::Price;

    use super::*;

    fn new_product(slug: &str) -> NewProduct {
        NewProduct {
            name: "Chili Oil".to_owned(),
            slug: slug.to_owned(),
            description: "Crunchy".to_owned(),
            price: Price::from_minor_units(1299).unwrap(),
            image: "https://cdn.example.com/chili.png".to_owned(),
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Test User".to_owned(),
            email: Email::parse(email).unwrap(),
            username: "test".to_owned(),
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let store = MemoryUserStore::new();
        let first = store.insert(new_user("a@b.com")).await.unwrap();
        assert_eq!(first.id, UserId::new(1));
        assert!(first.current_token.is_none());

        let err = store.insert(new_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Case-sensitive
        assert!(store.insert(new_user("A@b.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_current_token() {
        let store = MemoryUserStore::new();
        let user = store.insert(new_user("a@b.com")).await.unwrap();

        store.update_current_token(user.id, Some("tok")).await.unwrap();
        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.current_token.as_deref(), Some("tok"));

        store.update_current_token(user.id, None).await.unwrap();
        let found = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(found.current_token.is_none());

        let err = store
            .update_current_token(UserId::new(99), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_products_ordered_by_id() {
        let store = MemoryProductStore::new();
        store.insert(&new_product("b")).await.unwrap();
        store.insert(&new_product("a")).await.unwrap();

        let slugs: Vec<_> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, ["b", "a"]);
    }

    #[tokio::test]
    async fn test_update_by_slug_applies_patch() {
        let store = MemoryProductStore::new();
        let created = store.insert(&new_product("chili")).await.unwrap();

        let patch = ProductPatch {
            name: Some("Hot Chili Oil".to_owned()),
            price: Some(Price::from_minor_units(1499).unwrap()),
            ..ProductPatch::default()
        };
        let updated = store.update_by_slug("chili", &patch).await.unwrap().unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Hot Chili Oil");
        assert_eq!(updated.price.minor_units(), 1499);
        assert_eq!(updated.description, "Crunchy");
        assert!(updated.updated_at >= created.updated_at);

        assert!(
            store
                .update_by_slug("missing", &patch)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_slug_rename_conflict() {
        let store = MemoryProductStore::new();
        store.insert(&new_product("one")).await.unwrap();
        store.insert(&new_product("two")).await.unwrap();

        let patch = ProductPatch {
            slug: Some("two".to_owned()),
            ..ProductPatch::default()
        };
        let err = store.update_by_slug("one", &patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Renaming to its own slug is fine
        let patch = ProductPatch {
            slug: Some("one".to_owned()),
            ..ProductPatch::default()
        };
        assert!(store.update_by_slug("one", &patch).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_by_slug() {
        let store = MemoryProductStore::new();
        store.insert(&new_product("gone")).await.unwrap();

        assert!(store.delete_by_slug("gone").await.unwrap());
        assert!(!store.delete_by_slug("gone").await.unwrap());
        assert!(store.find_by_slug("gone").await.unwrap().is_none());
    }
}
