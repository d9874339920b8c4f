//! Runtime configuration.
//!
//! JSON with `snake_case` keys. Durations are human-readable strings
//! (`"90s"`, `"2m 30s"`). Every field has a default, so `{}` is a valid
//! config.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use atlas_core::{ReaderProfile, ScoreFormat, SummaryType};

use crate::RuntimeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub summary_type: SummaryType,
    pub reader_profile: ReaderProfile,
    pub score_format: ScoreFormat,

    /// Upper bound on one generate-and-stream attempt.
    #[serde(with = "human_duration")]
    pub attempt_timeout: Duration,

    /// Upper bound on one layout analyzer call, per retry.
    #[serde(with = "human_duration")]
    pub analyzer_timeout: Duration,

    pub analyzer_retry: RetryConfig,
    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            summary_type: SummaryType::Professional,
            reader_profile: ReaderProfile::General,
            score_format: ScoreFormat::Overall,
            attempt_timeout: Duration::from_secs(120),
            analyzer_timeout: Duration::from_secs(30),
            analyzer_retry: RetryConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.attempt_timeout.is_zero() {
            return Err(RuntimeError::InvalidConfig(
                "attempt_timeout must be positive".to_string(),
            ));
        }
        if self.analyzer_timeout.is_zero() {
            return Err(RuntimeError::InvalidConfig(
                "analyzer_timeout must be positive".to_string(),
            ));
        }
        if self.analyzer_retry.min_delay > self.analyzer_retry.max_delay {
            return Err(RuntimeError::InvalidConfig(format!(
                "analyzer_retry.min_delay {:?} exceeds max_delay {:?}",
                self.analyzer_retry.min_delay, self.analyzer_retry.max_delay
            )));
        }
        if self.cache.max_entries == 0 {
            return Err(RuntimeError::InvalidConfig(
                "cache.max_entries must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Exponential backoff for transient analyzer failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first call. Zero disables retrying.
    pub max_retries: usize,

    #[serde(with = "human_duration")]
    pub min_delay: Duration,

    #[serde(with = "human_duration")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Detection cache sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,

    #[serde(with = "human_duration")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
