/// Custom middleware for the API server
///
/// JWT authentication lives in [`crate::app`] next to the router it guards.

pub mod security;
