//! Request middleware.

pub mod auth;
pub mod edge;
pub mod session;
