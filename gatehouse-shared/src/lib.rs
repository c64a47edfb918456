//! # Gatehouse Shared Library
//!
//! Data layer and authorization core of the Gatehouse RBAC service.
//!
//! ## Module Organization
//!
//! - `db`: connection pool, migrations, change tracking and generic persistence
//! - `models`: record types and their database operations
//! - `auth`: password hashing, JWT tokens and permission resolution

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Gatehouse shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
