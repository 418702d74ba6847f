//! Request and Response models for the relay server
//!
//! Query parameters accepted by the relay endpoints, the relay [`Query`] with
//! its cache key policy, and the JSON bodies of the operational endpoints.

pub mod query;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use query::{derive_key, Query, QueryKind};
pub use requests::FilterParams;
pub use responses::{ErrorResponse, HealthResponse, StatsResponse};
