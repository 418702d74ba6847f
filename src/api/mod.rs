//! API Module
//!
//! HTTP handlers and routing for the relay server.
//!
//! # Endpoints
//! - `GET /icinga/...` - Cached relay of Icinga API queries
//! - `GET /_cache_internal/:group/:key` - Peer transport between cache nodes
//! - `GET /stats` - Cache group statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
