//! # TraceFed API
//!
//! The HTTP surface of the federation proxy. Each query route is a thin
//! adapter: bind path variables and the forwarded query string into a
//! per-backend operation, dispatch it across all backends, hand the envelope
//! list to the matching merger, and encode the result as protobuf-JSON or
//! binary protobuf depending on the caller's `Accept` header.

pub mod encode;
pub mod errors;
pub mod handlers;
pub mod state;

use axum::routing::get;
use axum::Router;
use state::AppState;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/traces/:trace_id", get(handlers::traces::trace_by_id))
        .route(
            "/api/v2/traces/:trace_id",
            get(handlers::traces::trace_by_id_v2),
        )
        .route("/api/search", get(handlers::search::search))
        .route("/api/search/tags", get(handlers::tags::tag_names))
        .route("/api/v2/search/tags", get(handlers::tags::tag_names_v2))
        .route(
            "/api/search/tag/:tag_name/values",
            get(handlers::tags::tag_values),
        )
        .route(
            "/api/v2/search/tag/:tag_name/values",
            get(handlers::tags::tag_values_v2),
        )
        .route("/ready", get(handlers::status::ready))
        .route("/api/echo", get(handlers::status::echo))
        .route("/api/status/buildinfo", get(handlers::status::buildinfo))
        .route("/api/status/instances", get(handlers::status::instances))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
