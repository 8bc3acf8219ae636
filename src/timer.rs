use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::route::RouteIdentity;

/// What the dispatch hook knows about the request in flight.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub route: RouteIdentity,
    pub started_at: DateTime<Utc>,
}

/// Result of closing a slot at response time.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRequest {
    pub route: RouteIdentity,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Per-request correlation slot shared between the dispatch hook and the
/// response hook.
///
/// One slot is created for exactly one request and travels with it in the
/// request extensions, so concurrent requests never see each other's start
/// time. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    inner: Arc<Mutex<Option<RequestContext>>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps the route and start time, replacing anything already there.
    pub fn on_request_start(&self, route: RouteIdentity, now: DateTime<Utc>) {
        *self.inner.lock() = Some(RequestContext {
            route,
            started_at: now,
        });
    }

    /// Takes the slot's contents and measures elapsed time against `now`.
    ///
    /// Returns `None` when dispatch was never observed (unmatched routes,
    /// early rejections). The slot is left empty either way.
    pub fn on_request_end(&self, now: DateTime<Utc>) -> Option<FinishedRequest> {
        let ctx = self.inner.lock().take()?;
        let elapsed = (now - ctx.started_at).to_std().unwrap_or(Duration::ZERO);
        Some(FinishedRequest {
            route: ctx.route,
            started_at: ctx.started_at,
            elapsed,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().is_some()
    }
}
