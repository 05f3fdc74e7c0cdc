//! Domain models shared by `ngo_core` and `ngo_api`.

pub mod auth;
