//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, logout and token verification
//! - `catalog` - Product reads through the cache and cache-coherent writes

pub mod auth;
pub mod catalog;

pub use auth::{AuthError, LoginUser, RegisterUser, SessionService};
pub use catalog::{CatalogError, CatalogService};
