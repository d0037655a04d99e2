//! # Academy Shared Library
//!
//! Domain types, persistence and authentication used by the academy API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and authorization
//! - `store`: Account store behind the credential flows
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the academy shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
