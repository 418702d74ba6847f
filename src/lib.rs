//! Meerkat Relay - caching relay between Meerkat dashboards and Icinga 2
//!
//! Dashboard requests are turned into cache keys and answered from a
//! distributed cache group. Misses are loaded from the Icinga API once per
//! key, however many dashboards ask at the same time.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod peers;
pub mod tasks;
pub mod upstream;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{RelayError, Result};
pub use tasks::spawn_cleanup_task;
