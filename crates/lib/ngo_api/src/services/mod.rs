//! Request-independent helpers shared by handlers and middleware.

pub mod auth;
pub mod content;
pub mod cookies;
