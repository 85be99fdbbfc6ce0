//! Finvise Core - Shared domain types.
//!
//! This crate provides the newtypes used across the Finvise workspace:
//! - `api` - Session and catalog services, stores, caches
//! - `cli` - Migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no cache
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
