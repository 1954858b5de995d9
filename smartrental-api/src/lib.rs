//! # SmartRental API Server Library
//!
//! Role-based authentication and admin user management for the SmartRental
//! property-rental backend.
//!
//! ## Modules
//!
//! - `app`: Application state, router, and authentication layers
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validated JSON extractor
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
