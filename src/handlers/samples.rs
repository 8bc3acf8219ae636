use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::samples::SlowSample;
use crate::store::SortedStore;
use crate::AppState;

use super::AppError;

/// How far back the live feed looks on every tick.
const STREAM_WINDOW_SECS: f64 = 3_600.0;
const STREAM_TICK: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct SamplesQuery {
    /// Only samples that started at or after this Unix time
    pub since: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SamplesResponse {
    pub key: String,
    pub count: usize,
    pub samples: Vec<SlowSample>,
}

/// Reads raw samples back out of the store, oldest first. Members that
/// don't parse are skipped.
pub async fn load_samples(
    store: &dyn SortedStore,
    key: &str,
    since: f64,
) -> Result<Vec<SlowSample>, AppError> {
    let raw = store.range_by_score(key, since, f64::INFINITY).await?;
    Ok(raw
        .iter()
        .filter_map(|(member, score)| SlowSample::parse(member, *score))
        .collect())
}

// ─── GET /api/slow ───────────────────────────────────────────────

pub async fn list_samples(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SamplesQuery>,
) -> Result<Json<SamplesResponse>, AppError> {
    let since = query.since.unwrap_or(f64::NEG_INFINITY);
    if since.is_nan() {
        return Err(AppError::BadRequest("since must be a number".into()));
    }

    let key = state.recorder.config().store_key.clone();
    let samples = load_samples(state.recorder.store().as_ref(), &key, since).await?;

    Ok(Json(SamplesResponse {
        key,
        count: samples.len(),
        samples,
    }))
}

// ─── GET /api/slow/stream ────────────────────────────────────────

/// Server-Sent Events feed of the last hour's samples, refreshed every
/// few seconds. The poller stops as soon as the client goes away.
pub async fn sample_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<ReceiverStream<Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STREAM_TICK);
        let key = state.recorder.config().store_key.clone();

        loop {
            interval.tick().await;
            let since = chrono::Utc::now().timestamp() as f64 - STREAM_WINDOW_SECS;

            let event = match load_samples(state.recorder.store().as_ref(), &key, since).await {
                Ok(samples) => samples_event(&samples),
                Err(e) => {
                    tracing::warn!(error = ?e, "sample stream read failed");
                    Event::default().event("error").data("store unavailable")
                }
            };

            if tx.send(Ok(event)).await.is_err() {
                break;
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// One `samples` frame, or an `error` frame if the batch can't be encoded.
fn samples_event(samples: &[SlowSample]) -> Event {
    match serde_json::to_string(samples) {
        Ok(json) => Event::default().event("samples").data(json),
        Err(e) => {
            tracing::warn!(error = %e, "sample stream encode failed");
            Event::default().event("error").data("cannot encode samples")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn load_skips_foreign_members_and_old_samples() {
        let store = MemoryStore::new();
        store.upsert("dumpslow", "app.old\n1.100", 100.0).await.unwrap();
        store.upsert("dumpslow", "app.view\n2.500", 200.0).await.unwrap();
        store.upsert("dumpslow", "not a sample", 300.0).await.unwrap();

        let samples = load_samples(&store, "dumpslow", 150.0).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].route, "app.view");
        assert_eq!(samples[0].elapsed_secs, 2.5);
        assert_eq!(samples[0].started_at, 200.0);
    }

    #[test]
    fn stream_frame_carries_encoded_samples() {
        let samples = vec![SlowSample {
            route: "app.view".into(),
            elapsed_secs: 2.5,
            request_id: None,
            started_at: 1_000_000_000.0,
        }];
        let frame = format!("{:?}", samples_event(&samples));
        assert!(frame.contains("samples"), "{frame}");
        assert!(frame.contains("app.view"), "{frame}");

        let empty = format!("{:?}", samples_event(&[]));
        assert!(empty.contains("[]"), "{empty}");
    }
}
