//! API Routes
//!
//! Configures the Axum router with the relay, peer and operational endpoints.

use std::any::Any as PanicPayload;
use std::time::Duration;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::error;

use super::handlers::{
    health_handler, icinga_check_handler, icinga_check_result_handler,
    icinga_check_state_handler, icinga_dynamic_text_handler, icinga_object_handler, peer_handler,
    stats_handler, AppState,
};
use crate::error::RelayError;
use crate::peers::PEER_BASE_PATH;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /icinga/:check_type` - Objects of one type
/// - `GET /icinga/:check_type/:object_id` - A single object
/// - `GET /icinga/dynamic_text/:host_name` - Custom variables of a host
/// - `GET /icinga/check_state` - State of filtered hosts or services
/// - `GET /icinga/check_result` - Last check result of filtered hosts or services
/// - `GET /_cache_internal/:group/:key` - Peer transport
/// - `GET /stats` - Cache group statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, dashboards are served from elsewhere
/// - Tracing: Logs all requests
/// - Timeout: Requests running longer than `request_timeout` get a 408
/// - Panic recovery: A panicking handler answers 500 instead of dropping
///   the connection
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let peer_route = format!("/{}/:group/:key", PEER_BASE_PATH);

    let router = Router::new()
        .route("/icinga/check_state", get(icinga_check_state_handler))
        .route("/icinga/check_result", get(icinga_check_result_handler))
        .route(
            "/icinga/dynamic_text/:host_name",
            get(icinga_dynamic_text_handler),
        )
        .route("/icinga/:check_type", get(icinga_check_handler))
        .route("/icinga/:check_type/:object_id", get(icinga_object_handler))
        .route(&peer_route, get(peer_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    with_middleware(router, request_timeout).with_state(state)
}

fn with_middleware<S>(router: Router<S>, request_timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(CatchPanicLayer::custom(catch_panic))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn catch_panic(err: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    error!(message = %message, "handler panicked");

    RelayError::CacheInternal("unexpected panic while handling request".to_string())
        .into_response()
}
