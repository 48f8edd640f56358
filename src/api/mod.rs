//! API Module
//!
//! Admin HTTP surface of the cache node.
//!
//! # Endpoints
//! - `GET /health` - Health check with node identity
//! - `GET /stats` - Cache statistics
//! - `GET /cache/:key` - Peek at a cached value without fetching

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
