use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::{identify_user, on_dispatch, timing_middleware};
use crate::route::RouteIdentity;
use crate::AppState;

/// Builds the full Axum `Router`: observed pages, the sample inspection
/// API, and the recording middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Identities are resolved once here, not per request.
    let index = RouteIdentity::of(&handlers::pages::index);
    let report = RouteIdentity::of(&handlers::pages::report);
    let export = RouteIdentity::of(&handlers::pages::export);

    Router::new()
        // ── Observed pages ──────────────────────────────────────
        .route(
            "/",
            get(handlers::pages::index)
                .route_layer(axum_mw::from_fn_with_state(index, on_dispatch)),
        )
        .route(
            "/reports/:id",
            get(handlers::pages::report)
                .route_layer(axum_mw::from_fn_with_state(report, on_dispatch)),
        )
        .route(
            "/admin/export",
            get(handlers::pages::export)
                .route_layer(axum_mw::from_fn_with_state(export, on_dispatch)),
        )
        // ── Sample inspection (not observed) ────────────────────
        .route("/api/slow", get(handlers::samples::list_samples))
        .route("/api/slow/stream", get(handlers::samples::sample_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(state, timing_middleware))
        .layer(axum_mw::from_fn(identify_user))
        .layer(CorsLayer::permissive())
}
