use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use dumpslow::mailer::{LogMailer, Mailer, RedisOutboxMailer};
use dumpslow::store::{MemoryStore, RedisStore, SortedStore};
use dumpslow::{server, AppState, Settings, SlowRequestRecorder};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,dumpslow=debug")),
        )
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   🐢  DUMPSLOW — slow request recorder           ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // ── 1. Resolve configuration (fails fast) ────────────────────
    let settings = Settings::load()?;
    let config = settings.resolve()?;
    tracing::info!(
        threshold = config.long_request_secs,
        alert_threshold = config.email_request_secs,
        key = %config.store_key,
        retention_secs = config.retention.as_secs(),
        "configuration resolved"
    );

    // ── 2. Connect the store ─────────────────────────────────────
    let (store, redis): (Arc<dyn SortedStore>, Option<RedisStore>) =
        if settings.store_url.starts_with("memory://") {
            tracing::warn!("using in-process store; samples are lost on restart");
            (Arc::new(MemoryStore::new()) as Arc<dyn SortedStore>, None)
        } else {
            println!("🔌 Connecting to Redis at {}...", settings.store_url);
            let redis = RedisStore::connect(&settings.store_url).await?;
            println!("   ✓ connected");
            (Arc::new(redis.clone()) as Arc<dyn SortedStore>, Some(redis))
        };

    // ── 3. Pick the alert transport ──────────────────────────────
    let mailer: Arc<dyn Mailer> = match (&settings.alert_outbox_key, &redis) {
        (Some(key), Some(redis)) => Arc::new(RedisOutboxMailer::new(redis.connection(), key.clone())),
        (Some(_), None) => {
            tracing::warn!("alert outbox needs a Redis store; logging alerts instead");
            Arc::new(LogMailer)
        }
        (None, _) => Arc::new(LogMailer),
    };

    // ── 4. Build shared state & router ───────────────────────────
    let state = AppState::new(SlowRequestRecorder::new(config, store, mailer));
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;

    println!();
    println!("Server listening on http://{}", settings.listen_addr);
    println!("Slow samples    → /api/slow");
    println!("Live feed (SSE) → /api/slow/stream");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}
