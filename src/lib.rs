//! Records slow HTTP requests into a Redis sorted set, prunes samples past
//! their retention window, and alerts when a request is severely slow.
//!
//! The axum glue lives in [`middleware`]; the policy lives in [`recorder`].

use std::sync::Arc;

pub mod config;
pub mod duration;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod recorder;
pub mod route;
pub mod samples;
pub mod server;
pub mod store;
pub mod timer;

pub use config::{MemberFormat, RecorderConfig, Settings};
pub use error::{ConfigError, MailError, RecordError, StoreError};
pub use recorder::{AlertOutcome, CompletedRequest, RecordOutcome, SlowRequestRecorder};
pub use route::RouteIdentity;
pub use timer::RequestSlot;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub recorder: Arc<SlowRequestRecorder>,
}

impl AppState {
    pub fn new(recorder: SlowRequestRecorder) -> Arc<Self> {
        Arc::new(Self {
            recorder: Arc::new(recorder),
        })
    }
}
