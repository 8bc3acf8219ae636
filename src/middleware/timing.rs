use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;

use crate::recorder::{CompletedRequest, RecordOutcome, RequestDetails};
use crate::route::RouteIdentity;
use crate::timer::RequestSlot;
use crate::AppState;

/// Headers quoted in alert bodies when present.
const DETAIL_HEADERS: &[&str] = &["host", "user-agent", "referer", "x-forwarded-for"];

/// Authenticated user for the request, set by an auth layer running
/// outside [`timing_middleware`].
#[derive(Debug, Clone)]
pub struct RequestUser(pub String);

/// Response-ready hook, applied globally.
///
/// Opens a [`RequestSlot`] for the request, lets the router run, then hands
/// whatever the dispatch hook stamped to the recorder. Recording problems
/// are logged and never change the response.
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let slot = RequestSlot::new();
    req.extensions_mut().insert(slot.clone());

    let path = req.uri().path().to_owned();
    let user = req.extensions().get::<RequestUser>().map(|u| u.0.clone());
    let request_id = request_id(req.headers());
    let details = RequestDetails {
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        headers: detail_headers(req.headers()),
    };

    let response = next.run(req).await;

    let now = Utc::now();
    // Nothing stamped: the request never reached an observed handler.
    let Some(done) = slot.on_request_end(now) else {
        return response;
    };

    let completed = CompletedRequest {
        route: done.route.to_string(),
        started_at: done.started_at,
        elapsed: done.elapsed,
        path,
        user,
        request_id,
        details,
    };

    match state.recorder.record_if_slow(&completed, now).await {
        Ok(RecordOutcome::Fast) => {}
        Ok(RecordOutcome::Recorded { alert }) => {
            tracing::debug!(route = %completed.route, ?alert, "slow request handled");
        }
        Err(e) => {
            tracing::warn!(
                route = %completed.route,
                path = %completed.path,
                error = %e,
                "failed to record slow request"
            );
        }
    }

    response
}

/// Dispatch-observed hook, applied per route with `route_layer` so it
/// only runs once a handler has been selected.
pub async fn on_dispatch(
    State(route): State<RouteIdentity>,
    req: Request,
    next: Next,
) -> Response {
    match req.extensions().get::<RequestSlot>() {
        Some(slot) => slot.on_request_start(route, Utc::now()),
        None => tracing::trace!(%route, "no request slot; timing middleware not installed"),
    }
    next.run(req).await
}

/// Demo auth layer: trusts an `x-user` header.
pub async fn identify_user(mut req: Request, next: Next) -> Response {
    let user = req
        .headers()
        .get("x-user")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| RequestUser(v.to_owned()));
    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    next.run(req).await
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()[..8].to_owned())
}

fn detail_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    DETAIL_HEADERS
        .iter()
        .filter_map(|name| {
            let value = headers.get(*name)?.to_str().ok()?;
            Some(((*name).to_owned(), value.to_owned()))
        })
        .collect()
}
