use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Parses a retention interval such as `"4w"`, `"36h"` or `"1d12h"`.
///
/// A bare integer is taken as seconds.
pub fn parse_interval(value: &str) -> Result<Duration, ConfigError> {
    let text = value.trim();
    if let Ok(secs) = u64::from_str(text) {
        return Ok(Duration::from_secs(secs));
    }

    humantime::parse_duration(text).map_err(|e| ConfigError::InvalidInterval {
        value: value.to_owned(),
        reason: e.to_string(),
    })
}
