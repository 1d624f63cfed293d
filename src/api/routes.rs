//! API route definitions

use super::handlers::{self, GateState};
use crate::auth::require_auth;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
///
/// | Route      | Gate                         |
/// |------------|------------------------------|
/// | `/public`  | none                         |
/// | `/private` | valid token                  |
/// | `/course`  | valid token + `read:courses` |
/// | `/admin`   | valid token + role `admin`   |
pub fn create_router(state: GateState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes behind the bearer token gate
    let protected = Router::new()
        .route("/private", get(handlers::private))
        .route("/course", get(handlers::courses))
        .route("/admin", get(handlers::admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/public", get(handlers::public))
        .merge(protected)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
