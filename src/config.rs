use serde::Deserialize;
use std::time::Duration;

use crate::duration::parse_interval;
use crate::error::ConfigError;

/// Sentinel for `email_request_secs` meaning "never send alerts".
pub const EMAIL_DISABLED: f64 = -1.0;

// ─── Member layout ───────────────────────────────────────────────

/// How sample members are laid out in the sorted set.
///
/// `Compat` is the historical `<route>\n<secs>` form; two requests with the
/// same route and the same 3-decimal duration collapse into one entry.
/// `WithRequestId` appends a per-request id so every slow request is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberFormat {
    #[default]
    Compat,
    WithRequestId,
}

// ─── Raw settings ────────────────────────────────────────────────

/// Settings as they arrive from the config file / environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Requests at or above this many seconds are recorded
    #[serde(default = "default_long_request_secs")]
    pub long_request_secs: f64,

    /// Requests above this many seconds trigger an alert (-1 disables)
    #[serde(default = "default_email_request_secs")]
    pub email_request_secs: f64,

    /// Sorted-set key holding the samples
    #[serde(default = "default_redis_key")]
    pub redis_key: String,

    /// Retention window, e.g. "4w"
    #[serde(default = "default_delete_after")]
    pub delete_after: String,

    /// Path prefixes that never alert
    #[serde(default)]
    pub email_excludes: Vec<String>,

    /// Surface mail failures instead of swallowing them
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub member_format: MemberFormat,

    /// `redis://...` or `memory://`
    #[serde(default = "default_store_url")]
    pub store_url: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// When set, alerts are queued on this Redis list instead of logged
    #[serde(default)]
    pub alert_outbox_key: Option<String>,
}

fn default_long_request_secs() -> f64 {
    1.0
}
fn default_email_request_secs() -> f64 {
    EMAIL_DISABLED
}
fn default_redis_key() -> String {
    "dumpslow".into()
}
fn default_delete_after() -> String {
    "4w".into()
}
fn default_store_url() -> String {
    "redis://127.0.0.1:6379/".into()
}
fn default_listen_addr() -> String {
    "0.0.0.0:3000".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            long_request_secs: default_long_request_secs(),
            email_request_secs: default_email_request_secs(),
            redis_key: default_redis_key(),
            delete_after: default_delete_after(),
            email_excludes: Vec::new(),
            strict: false,
            member_format: MemberFormat::default(),
            store_url: default_store_url(),
            listen_addr: default_listen_addr(),
            alert_outbox_key: None,
        }
    }
}

impl Settings {
    /// Loads `$DUMPSLOW_CONFIG` (JSON) if set, then applies `DUMPSLOW_*`
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = match std::env::var("DUMPSLOW_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Scalar overrides, looked up through `lookup` so tests don't touch
    /// the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DUMPSLOW_LONG_REQUEST_TIME") {
            self.long_request_secs = parse_secs("long_request_secs", &v)?;
        }
        if let Some(v) = lookup("DUMPSLOW_EMAIL_REQUEST_TIME") {
            self.email_request_secs = parse_secs("email_request_secs", &v)?;
        }
        if let Some(v) = lookup("DUMPSLOW_REDIS_KEY") {
            self.redis_key = v;
        }
        if let Some(v) = lookup("DUMPSLOW_DELETE_AFTER") {
            self.delete_after = v;
        }
        if let Some(v) = lookup("DUMPSLOW_EMAIL_EXCLUDES") {
            self.email_excludes = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("DUMPSLOW_STRICT") {
            self.strict = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("DUMPSLOW_STORE_URL") {
            self.store_url = v;
        }
        if let Some(v) = lookup("DUMPSLOW_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Some(v) = lookup("DUMPSLOW_ALERT_OUTBOX") {
            self.alert_outbox_key = Some(v).filter(|k| !k.is_empty());
        }
        Ok(())
    }

    /// Validates thresholds and parses the retention window.
    pub fn resolve(&self) -> Result<RecorderConfig, ConfigError> {
        if !self.long_request_secs.is_finite() || self.long_request_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "long_request_secs",
                reason: format!("must be a non-negative number, got {}", self.long_request_secs),
            });
        }

        let email = self.email_request_secs;
        if !email.is_finite() || (email < 0.0 && email != EMAIL_DISABLED) {
            return Err(ConfigError::InvalidValue {
                field: "email_request_secs",
                reason: format!("must be >= 0 or {EMAIL_DISABLED}, got {email}"),
            });
        }

        if self.redis_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "redis_key",
                reason: "must not be empty".into(),
            });
        }

        let retention = parse_interval(&self.delete_after)?;
        // The prune cutoff is computed in signed Unix seconds.
        if i64::try_from(retention.as_secs()).is_err() {
            return Err(ConfigError::InvalidInterval {
                value: self.delete_after.clone(),
                reason: "retention window too large".into(),
            });
        }

        Ok(RecorderConfig {
            long_request_secs: self.long_request_secs,
            email_request_secs: email,
            store_key: self.redis_key.clone(),
            retention,
            email_exclude_prefixes: self.email_excludes.clone(),
            strict: self.strict,
            member_format: self.member_format,
        })
    }
}

fn parse_secs(field: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        reason: format!("{value:?} is not a number"),
    })
}

// ─── Resolved config ─────────────────────────────────────────────

/// Read-only policy consumed by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    pub long_request_secs: f64,
    pub email_request_secs: f64,
    pub store_key: String,
    pub retention: Duration,
    pub email_exclude_prefixes: Vec<String>,
    pub strict: bool,
    pub member_format: MemberFormat,
}

impl RecorderConfig {
    pub fn alerts_enabled(&self) -> bool {
        self.email_request_secs >= 0.0
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            long_request_secs: default_long_request_secs(),
            email_request_secs: EMAIL_DISABLED,
            store_key: default_redis_key(),
            retention: Duration::from_secs(4 * 7 * 24 * 60 * 60),
            email_exclude_prefixes: Vec::new(),
            strict: false,
            member_format: MemberFormat::Compat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_resolve_to_default_config() {
        let config = Settings::default().resolve().unwrap();
        assert_eq!(config, RecorderConfig::default());
        assert!(!config.alerts_enabled());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"email_request_secs": 5, "member_format": "with_request_id"}"#)
                .unwrap();
        assert_eq!(settings.email_request_secs, 5.0);
        assert_eq!(settings.redis_key, "dumpslow");
        assert_eq!(settings.delete_after, "4w");
        assert_eq!(settings.member_format, MemberFormat::WithRequestId);
        assert!(settings.resolve().unwrap().alerts_enabled());
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DUMPSLOW_LONG_REQUEST_TIME", "0.5"),
            ("DUMPSLOW_EMAIL_EXCLUDES", "/admin/, /static/ ,"),
            ("DUMPSLOW_STRICT", "true"),
            ("DUMPSLOW_DELETE_AFTER", "1d"),
        ]);
        let mut settings = Settings::default();
        settings
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        let config = settings.resolve().unwrap();
        assert_eq!(config.long_request_secs, 0.5);
        assert_eq!(config.email_exclude_prefixes, vec!["/admin/", "/static/"]);
        assert!(config.strict);
        assert_eq!(config.retention, Duration::from_secs(86_400));
    }

    #[test]
    fn non_numeric_threshold_override_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|name| (name == "DUMPSLOW_LONG_REQUEST_TIME").then(|| "slow".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "long_request_secs", .. }));
    }

    #[test]
    fn bad_retention_fails_at_resolution() {
        let settings = Settings {
            delete_after: "forever".into(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.resolve(),
            Err(ConfigError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn retention_beyond_signed_seconds_is_rejected() {
        for huge in ["9223372036854775808s", "10000000000000000000s", "18446744073709551615"] {
            let settings = Settings {
                delete_after: huge.into(),
                ..Settings::default()
            };
            assert!(
                matches!(settings.resolve(), Err(ConfigError::InvalidInterval { .. })),
                "{huge} should be rejected"
            );
        }

        let largest = Settings {
            delete_after: i64::MAX.to_string(),
            ..Settings::default()
        };
        assert_eq!(largest.resolve().unwrap().retention.as_secs(), i64::MAX as u64);
    }

    #[test]
    fn bad_thresholds_are_rejected() {
        let negative = Settings {
            long_request_secs: -0.1,
            ..Settings::default()
        };
        assert!(negative.resolve().is_err());

        let odd_sentinel = Settings {
            email_request_secs: -2.0,
            ..Settings::default()
        };
        assert!(odd_sentinel.resolve().is_err());

        let zero_alert = Settings {
            email_request_secs: 0.0,
            ..Settings::default()
        };
        assert!(zero_alert.resolve().unwrap().alerts_enabled());
    }
}
