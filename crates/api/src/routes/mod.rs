//! HTTP routes

pub mod health;
pub mod links;
pub mod mappings;
pub mod site;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{auth::require_admin, state::AppState};

/// Create all routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Mapping administration, admin token required
    let admin_routes = Router::new()
        .route(
            "/domain-mappings",
            get(mappings::list_mappings).put(mappings::reconcile_mappings),
        )
        .route("/site-urls", post(links::site_url))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(DefaultBodyLimit::max(1024 * 1024));

    Router::new()
        .merge(health_routes)
        .nest("/api/v1", admin_routes)
        // Everything else is a site request
        .fallback(site::resolve_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
