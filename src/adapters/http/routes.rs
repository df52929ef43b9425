//! Axum router configuration for the gate API.
//!
//! # Routes
//!
//! - `GET /health` - Liveness probe (public)
//! - `GET /api/admin/access` - Admin tree, gated by `AdminOnly`
//! - `GET /api/portal/access` - Client portal tree, gated by `SignedIn`
//! - `GET /api/admin-signup` - Whether bootstrap sign-up is open (public)
//! - `POST /api/admin-signup` - Bootstrap sign-up (public)

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::domain::gate::GatePolicy;

use super::handlers::{access_summary, admin_signup, health, signup_availability, AppState};
use super::middleware::gate_middleware;

/// Routes behind one gate policy.
fn gated_routes(state: &AppState, policy: GatePolicy) -> Router<AppState> {
    Router::new()
        .route("/access", get(access_summary))
        .route_layer(middleware::from_fn_with_state(state.gate(policy), gate_middleware))
}

/// Create the API router without transport layers.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/admin", gated_routes(&state, GatePolicy::AdminOnly))
        .nest("/api/portal", gated_routes(&state, GatePolicy::SignedIn))
        .route(
            "/api/admin-signup",
            get(signup_availability).post(admin_signup),
        )
        .with_state(state)
}

/// Create the complete application: API routes plus tracing, timeout and
/// CORS layers configured from `server`.
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    api_router(state)
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
