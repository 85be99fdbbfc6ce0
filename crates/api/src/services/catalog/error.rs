//! Catalog error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::error::ErrorKind;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product has this slug.
    #[error("Product with slug {slug} not found")]
    NotFound {
        /// The slug as requested.
        slug: String,
    },

    /// Another product already uses this slug.
    #[error("Product with slug {slug} already exists")]
    SlugTaken {
        /// The contested slug.
        slug: String,
    },

    /// Input failed a field rule.
    #[error("{0}")]
    Validation(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CatalogError {
    pub(crate) fn not_found(slug: &str) -> Self {
        Self::NotFound {
            slug: slug.to_owned(),
        }
    }

    /// Classify for the request layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SlugTaken { .. } => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
