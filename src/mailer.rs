use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::Serialize;

use crate::error::MailError;

/// Delivers an alert to whoever administers the site.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), MailError>;
}

// ─── Log transport ───────────────────────────────────────────────

/// Writes alerts to the log instead of mailing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), MailError> {
        tracing::warn!(target: "dumpslow::alert", subject, body, "slow page alert");
        Ok(())
    }
}

// ─── Redis outbox transport ──────────────────────────────────────

/// Queues alerts on a Redis list for an external mail relay to send.
#[derive(Clone)]
pub struct RedisOutboxMailer {
    conn: ConnectionManager,
    key: String,
}

/// Envelope pushed onto the outbox list as JSON.
#[derive(Debug, Serialize)]
pub struct OutboxMessage<'a> {
    pub subject: &'a str,
    pub body: &'a str,
    pub queued_at: String,
}

impl RedisOutboxMailer {
    pub fn new(conn: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            conn,
            key: key.into(),
        }
    }
}

#[async_trait]
impl Mailer for RedisOutboxMailer {
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let envelope = OutboxMessage {
            subject,
            body,
            queued_at: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_string(&envelope).map_err(|e| MailError(e.to_string()))?;

        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(&self.key).arg(payload);
        let _: i64 = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| MailError(format!("outbox {}: {e}", self.key)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.deliver("SLOW PAGE: /", "body").await.is_ok());
    }

    #[test]
    fn outbox_envelope_is_flat_json() {
        let msg = OutboxMessage {
            subject: "SLOW PAGE: /reports",
            body: "took a while",
            queued_at: "2026-01-01T00:00:00+00:00".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["subject"], "SLOW PAGE: /reports");
        assert_eq!(json["body"], "took a while");
        assert_eq!(json["queued_at"], "2026-01-01T00:00:00+00:00");
    }
}
