//! Demo pages with deliberately uneven latency, so the recorder has
//! something to catch.

use axum::{extract::Path, Json};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use super::AppError;

#[derive(Debug, Serialize)]
pub struct Page {
    pub name: String,
    pub rendered_in_ms: u64,
}

// ─── GET / ───────────────────────────────────────────────────────

pub async fn index() -> Json<Page> {
    Json(Page {
        name: "index".into(),
        rendered_in_ms: 0,
    })
}

// ─── GET /reports/:id ────────────────────────────────────────────

/// Renders in 50 ms – 2.5 s; roughly a third of calls cross the default
/// 1 s threshold.
pub async fn report(Path(id): Path<u32>) -> Result<Json<Page>, AppError> {
    if id == 0 {
        return Err(AppError::NotFound("report 0 does not exist".into()));
    }

    let ms = rand::thread_rng().gen_range(50..2_500);
    tokio::time::sleep(Duration::from_millis(ms)).await;

    Ok(Json(Page {
        name: format!("report-{id}"),
        rendered_in_ms: ms,
    }))
}

// ─── GET /admin/export ───────────────────────────────────────────

/// Always slow. Usually listed in `email_excludes`.
pub async fn export() -> Json<Page> {
    let ms = 1_500;
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(Page {
        name: "export".into(),
        rendered_in_ms: ms,
    })
}
