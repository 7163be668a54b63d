//! Engine configuration.
//!
//! # Responsibility
//! - Hold the knobs the domain service may tune: index bounds policy for
//!   reorder, SQLite busy timeout, and optional log level.
//! - Parse configuration from JSON with defaults for every missing field.
//!
//! # Invariants
//! - `busy_timeout_ms` is never zero; concurrent writers must wait.
//! - `log_level`, when present, is one of `trace|debug|info|warn|error`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// How `reorder` treats a target index beyond the last active position.
///
/// Negative targets are always rejected, independent of this policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBoundsPolicy {
    /// Clamp to `active_count - 1`.
    #[default]
    Clamp,
    /// Fail with `InvalidArgument`.
    Reject,
    /// Use the value as given. Can leave a gap at the tail.
    Trust,
}

/// Runtime configuration for the ordering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub index_bounds: IndexBoundsPolicy,
    pub busy_timeout_ms: u64,
    pub log_level: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_bounds: IndexBoundsPolicy::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: None,
        }
    }
}

impl EngineConfig {
    /// Parses and validates configuration from a JSON document.
    ///
    /// Missing fields fall back to [`EngineConfig::default`].
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ZeroBusyTimeout);
        }
        if let Some(level) = self.log_level.as_deref() {
            if !matches!(
                level.trim().to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "warning" | "error"
            ) {
                return Err(ConfigError::UnsupportedLogLevel(level.to_string()));
            }
        }
        Ok(())
    }
}

/// Configuration parse/validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    ZeroBusyTimeout,
    UnsupportedLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid engine config: {message}"),
            Self::ZeroBusyTimeout => write!(f, "busy_timeout_ms must be greater than zero"),
            Self::UnsupportedLogLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig, IndexBoundsPolicy};

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.index_bounds, IndexBoundsPolicy::Clamp);
    }

    #[test]
    fn parses_bounds_policy_in_snake_case() {
        let config = EngineConfig::from_json_str(r#"{"index_bounds":"reject"}"#)
            .expect("reject policy should parse");
        assert_eq!(config.index_bounds, IndexBoundsPolicy::Reject);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn rejects_zero_busy_timeout() {
        let err = EngineConfig::from_json_str(r#"{"busy_timeout_ms":0}"#)
            .expect_err("zero timeout must be rejected");
        assert_eq!(err, ConfigError::ZeroBusyTimeout);
    }

    #[test]
    fn rejects_unknown_fields_and_levels() {
        let err = EngineConfig::from_json_str(r#"{"bounds":"clamp"}"#)
            .expect_err("unknown field must be rejected");
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EngineConfig::from_json_str(r#"{"log_level":"loud"}"#)
            .expect_err("unknown level must be rejected");
        assert_eq!(err, ConfigError::UnsupportedLogLevel("loud".to_string()));
    }
}
