//! # ngo_core
//!
//! Core domain logic for the NGO site: admin authentication, user storage,
//! the per-session connection pool, and content collections.

pub mod auth;
pub mod content;
pub mod migrate;
pub mod models;
pub mod pool;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
