//! Job configuration.

use chrono::Duration;
use langsnap_engine::{EngineConfig, RetryConfig};
use crate::error::{JobError, JobResult};
use serde::Deserialize;

/// Configuration shared by every job handler.
///
/// Loaded from JSON; absent fields take their defaults.
///
/// ```rust
/// use langsnap_jobs::JobConfig;
///
/// let config: JobConfig = serde_json::from_str(r#"{"maxAttempts": 5, "retention": {"fallbackDays": 3}}"#).unwrap();
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.retention.fallback().num_days(), 3);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobConfig {
    /// Attempts per resource before a transient failure fails the job.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on a retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Artifact retention.
    pub retention: RetentionConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 200,
            max_delay_ms: 10_000,
            retention: RetentionConfig::default(),
        }
    }
}

impl JobConfig {
    /// Sets the attempts per resource.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the retry delays.
    pub fn with_delays(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_delay_ms = initial_ms;
        self.max_delay_ms = max_ms;
        self
    }

    /// Sets the retention policy.
    pub fn with_retention(mut self, retention: RetentionConfig) -> Self {
        self.retention = retention;
        self
    }

    /// Builds the engine configuration for one run.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new().with_retry(
            RetryConfig::new(self.max_attempts.max(1))
                .with_initial_delay(std::time::Duration::from_millis(self.initial_delay_ms))
                .with_max_delay(std::time::Duration::from_millis(self.max_delay_ms)),
        )
    }
}

/// Longest fallback retention accepted, in days.
pub const MAX_FALLBACK_DAYS: u32 = 3650;

/// How long export artifacts live when they carry no explicit expiry.
///
/// The window is validated on construction and on deserialization, so a
/// negative or absurd `fallbackDays` never reaches the cleanup job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRetention")]
pub struct RetentionConfig {
    fallback_days: u32,
}

#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawRetention {
    fallback_days: i64,
}

impl Default for RawRetention {
    fn default() -> Self {
        Self { fallback_days: 7 }
    }
}

impl TryFrom<RawRetention> for RetentionConfig {
    type Error = JobError;

    fn try_from(raw: RawRetention) -> JobResult<Self> {
        let days = u32::try_from(raw.fallback_days).map_err(|_| {
            JobError::Config(format!(
                "fallbackDays must be between 0 and {MAX_FALLBACK_DAYS}, got {}",
                raw.fallback_days
            ))
        })?;
        Self::new(days)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { fallback_days: 7 }
    }
}

impl RetentionConfig {
    /// Creates a retention policy.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Config`] if `fallback_days` exceeds
    /// [`MAX_FALLBACK_DAYS`].
    pub fn new(fallback_days: u32) -> JobResult<Self> {
        if fallback_days > MAX_FALLBACK_DAYS {
            return Err(JobError::Config(format!(
                "fallbackDays must be between 0 and {MAX_FALLBACK_DAYS}, got {fallback_days}"
            )));
        }
        Ok(Self { fallback_days })
    }

    /// Days an artifact without an explicit expiry is kept.
    pub fn fallback_days(&self) -> u32 {
        self.fallback_days
    }

    /// Returns the fallback window.
    pub fn fallback(&self) -> Duration {
        Duration::days(i64::from(self.fallback_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: JobConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retention.fallback(), Duration::days(7));
    }

    #[test]
    fn negative_fallback_is_rejected() {
        let err = serde_json::from_str::<JobConfig>(r#"{"retention": {"fallbackDays": -1}}"#).unwrap_err();
        assert!(err.to_string().contains("fallbackDays"));
    }

    #[test]
    fn oversized_fallback_is_rejected() {
        let json = r#"{"retention": {"fallbackDays": 1000000000000}}"#;
        assert!(serde_json::from_str::<JobConfig>(json).is_err());
        assert!(matches!(RetentionConfig::new(MAX_FALLBACK_DAYS + 1), Err(JobError::Config(_))));
    }

    #[test]
    fn bounds_are_accepted() {
        let zero: RetentionConfig = serde_json::from_str(r#"{"fallbackDays": 0}"#).unwrap();
        assert_eq!(zero.fallback(), Duration::zero());
        let max = RetentionConfig::new(MAX_FALLBACK_DAYS).unwrap();
        assert_eq!(max.fallback().num_days(), i64::from(MAX_FALLBACK_DAYS));
    }
}
