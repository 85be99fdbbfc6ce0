//! Finvise commerce core.
//!
//! Product catalog reads behind a cache-aside layer, and user sessions backed
//! by signed bearer tokens. The crate is transport-agnostic: it exposes
//! services, error mapping and request extractors for a host router to use.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
