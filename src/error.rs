use thiserror::Error;

/// Raised while resolving settings into a [`RecorderConfig`](crate::config::RecorderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interval {value:?}: {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the sorted-set store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store write failed: {0}")]
    WriteFailed(String),

    #[error("store read failed: {0}")]
    ReadFailed(String),
}

#[derive(Debug, Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Everything `record_if_slow` can hand back to its caller.
///
/// Mail failures only show up here in strict mode.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mail(#[from] MailError),
}
