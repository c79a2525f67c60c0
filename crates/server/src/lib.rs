//! The HTTP gateway binary's library half: router construction plus every
//! module `main.rs` wires together. Split out so integration tests can
//! build the same [`axum::Router`] the binary serves without spawning a
//! real process.

pub mod admission;
pub mod error;
pub mod request_id;
pub mod routes;
pub mod scheduler;
pub mod state;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Builds the router with every route and ambient middleware layer
/// (§4.7). `allowed_origins` mirrors `GatewaySettings::allowed_origins`;
/// `["*"]` means any origin, matching the teacher's permissive default.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods([Method::GET, Method::POST])
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
    };

    Router::new()
        .route("/v1/audio/transcriptions", post(routes::transcribe))
        .route("/v1/models", get(routes::list_models))
        .route("/v1/models/current", get(routes::current_model))
        .route("/health", get(routes::health))
        .layer(axum::middleware::from_fn(request_id::assign_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
