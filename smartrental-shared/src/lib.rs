//! # SmartRental Shared Library
//!
//! Types, persistence, and auth primitives shared by the SmartRental API
//! server and its integration tests.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing, JWT tokens, request auth context, role checks
//! - `db`: Connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the SmartRental shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
