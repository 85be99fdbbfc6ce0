//! Request-layer helpers.
//!
//! Routing is left to the host application; this module provides the
//! extractors a router needs to guard authenticated routes.

pub mod auth;

pub use auth::{BearerToken, RequireUser};
