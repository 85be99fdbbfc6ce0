//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finvise_core::{Price, ProductId};

/// A catalog entry.
///
/// This is also the cache payload, so it round-trips through JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unique external identifier, used verbatim.
    pub slug: String,
    pub description: String,
    /// Minor currency units.
    pub price: Price,
    /// Absolute image URL.
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a product.
///
/// Text fields are checked by the catalog service before they reach a store;
/// `Price` is valid by construction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Price,
    pub image: String,
}

/// Partial update for a product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    pub image: Option<String>,
}

impl ProductPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image.is_none()
    }
}
