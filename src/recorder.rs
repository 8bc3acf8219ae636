use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RecorderConfig;
use crate::error::RecordError;
use crate::mailer::Mailer;
use crate::samples::SlowSample;
use crate::store::SortedStore;

// ─── Inputs ──────────────────────────────────────────────────────

/// Everything known about a request once its response is ready.
#[derive(Debug, Clone)]
pub struct CompletedRequest {
    /// Rendered route identity, e.g. `app.views.index`
    pub route: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub path: String,
    /// `None` for anonymous requests
    pub user: Option<String>,
    pub request_id: String,
    pub details: RequestDetails,
}

/// The slice of the request quoted in alert bodies.
#[derive(Debug, Clone, Default)]
pub struct RequestDetails {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, String)>,
}

impl fmt::Display for RequestDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)?;
        for (name, value) in &self.headers {
            write!(f, "\n{name}: {value}")?;
        }
        Ok(())
    }
}

// ─── Outputs ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Under the long-request threshold; nothing was written.
    Fast,
    Recorded { alert: AlertOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Disabled,
    BelowThreshold,
    Excluded,
    Sent,
    /// Mailer failed and the failure was swallowed (non-strict mode).
    Failed,
}

// ─── Recorder ────────────────────────────────────────────────────

/// Decides whether a finished request was slow, stores a sample for it,
/// prunes expired samples and alerts on severe cases.
///
/// Holds no state between calls; everything shared lives in the store.
pub struct SlowRequestRecorder {
    config: RecorderConfig,
    store: Arc<dyn SortedStore>,
    mailer: Arc<dyn Mailer>,
}

impl SlowRequestRecorder {
    pub fn new(config: RecorderConfig, store: Arc<dyn SortedStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            store,
            mailer,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SortedStore> {
        &self.store
    }

    /// Records `req` if it took at least the long-request threshold.
    ///
    /// Store failures are returned to the caller. Mail failures are only
    /// returned in strict mode.
    pub async fn record_if_slow(
        &self,
        req: &CompletedRequest,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, RecordError> {
        let elapsed = req.elapsed.as_secs_f64();

        if elapsed < self.config.long_request_secs {
            tracing::debug!(route = %req.route, elapsed, "fast request");
            return Ok(RecordOutcome::Fast);
        }

        // ── Sample ──────────────────────────────────────────────
        let sample = SlowSample {
            route: req.route.clone(),
            elapsed_secs: elapsed,
            request_id: Some(req.request_id.clone()),
            started_at: unix_secs(req.started_at),
        };
        let key = &self.config.store_key;
        self.store
            .upsert(key, &sample.member(self.config.member_format), sample.started_at)
            .await?;

        // ── Prune ───────────────────────────────────────────────
        let retention = i64::try_from(self.config.retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.timestamp().saturating_sub(retention);
        let pruned = self
            .store
            .remove_range_by_score(key, 0.0, cutoff as f64)
            .await?;

        tracing::info!(
            route = %req.route,
            path = %req.path,
            elapsed = format_args!("{elapsed:.3}"),
            pruned,
            "slow request recorded"
        );

        let alert = self.alert(req, elapsed).await?;
        Ok(RecordOutcome::Recorded { alert })
    }

    async fn alert(&self, req: &CompletedRequest, elapsed: f64) -> Result<AlertOutcome, RecordError> {
        let threshold = self.config.email_request_secs;
        if !self.config.alerts_enabled() {
            return Ok(AlertOutcome::Disabled);
        }
        if elapsed <= threshold {
            return Ok(AlertOutcome::BelowThreshold);
        }
        if self
            .config
            .email_exclude_prefixes
            .iter()
            .any(|prefix| req.path.starts_with(prefix.as_str()))
        {
            return Ok(AlertOutcome::Excluded);
        }

        let (subject, body) = alert_message(req, elapsed, threshold);
        match self.mailer.deliver(&subject, &body).await {
            Ok(()) => Ok(AlertOutcome::Sent),
            Err(e) if self.config.strict => Err(e.into()),
            Err(e) => {
                tracing::warn!(path = %req.path, error = %e, "slow page alert not delivered");
                Ok(AlertOutcome::Failed)
            }
        }
    }
}

/// Subject and body of a slow-page alert.
pub fn alert_message(req: &CompletedRequest, elapsed: f64, threshold: f64) -> (String, String) {
    let user = req.user.as_deref().unwrap_or("AnonymousUser");
    let subject = format!("SLOW PAGE: {}", req.path);
    let body = format!(
        "This page took {elapsed:.2} seconds to render for {user}, \
         which is over the threshold of {threshold}.\n\n{}",
        req.details
    );
    (subject, body)
}

fn unix_secs(at: DateTime<Utc>) -> f64 {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_micros()) / 1_000_000.0
}
