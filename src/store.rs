use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use redis::RedisError;
use std::collections::HashMap;

use crate::error::StoreError;

/// The two writes the recorder needs from a sorted-set store, plus a read
/// for inspecting what has been recorded.
///
/// Each call is expected to be atomic on the store side; callers do no
/// locking of their own.
#[async_trait]
pub trait SortedStore: Send + Sync {
    /// Inserts `member`, or moves it to `score` if already present.
    async fn upsert(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// Removes every member with `min <= score <= max`. Returns how many went.
    async fn remove_range_by_score(&self, key: &str, min: f64, max: f64)
        -> Result<u64, StoreError>;

    /// Members with `min <= score <= max`, ascending by score.
    async fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError>;
}

// ─── Redis ───────────────────────────────────────────────────────

/// Sorted-set store backed by a Redis ZSET.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on its own, so
/// every call clones it rather than holding a lock.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid Redis URL \"{url}\": {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Unavailable(format!("cannot connect to {url}: {e}")))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

fn write_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::WriteFailed(e.to_string())
    }
}

fn read_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::ReadFailed(e.to_string())
    }
}

/// Redis spells unbounded score limits as `-inf` / `+inf`.
fn score_arg(score: f64) -> String {
    if score == f64::INFINITY {
        "+inf".into()
    } else if score == f64::NEG_INFINITY {
        "-inf".into()
    } else {
        score.to_string()
    }
}

#[async_trait]
impl SortedStore for RedisStore {
    async fn upsert(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(key).arg(score_arg(score)).arg(member);
        let _: i64 = cmd.query_async(&mut conn).await.map_err(write_error)?;
        Ok(())
    }

    async fn remove_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("ZREMRANGEBYSCORE");
        cmd.arg(key).arg(score_arg(min)).arg(score_arg(max));
        let removed: u64 = cmd.query_async(&mut conn).await.map_err(write_error)?;
        Ok(removed)
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("ZRANGEBYSCORE");
        cmd.arg(key)
            .arg(score_arg(min))
            .arg(score_arg(max))
            .arg("WITHSCORES");
        cmd.query_async(&mut conn).await.map_err(read_error)
    }
}

// ─── In-process ──────────────────────────────────────────────────

/// Sorted sets kept in process memory. Used for `memory://` store URLs
/// and in tests.
#[derive(Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, HashMap<String, f64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, key: &str) -> usize {
        self.sets.lock().get(key).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, key: &str) -> bool {
        self.len(key) == 0
    }

    pub fn score(&self, key: &str, member: &str) -> Option<f64> {
        self.sets.lock().get(key)?.get(member).copied()
    }
}

#[async_trait]
impl SortedStore for MemoryStore {
    async fn upsert(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        self.sets
            .lock()
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), score);
        Ok(())
    }

    async fn remove_range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError> {
        let mut sets = self.sets.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|_, score| *score < min || *score > max);
        let removed = (before - set.len()) as u64;
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    async fn range_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<(String, f64)>, StoreError> {
        let sets = self.sets.lock();
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };
        let mut found: Vec<(String, f64)> = set
            .iter()
            .filter(|(_, score)| **score >= min && **score <= max)
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        // Ties order lexicographically, as Redis does.
        found.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(found)
    }
}
