//! Configuration for transfer runs.

use crate::mapper::{IdAllocation, IdMappers};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How imported rows relate to the destination's identifier spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Same identifier space: rows are written with their original keys.
    Restore,
    /// Different identifier space: keys are translated through ID mappers.
    Import,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMode::Restore => f.write_str("restore"),
            TransferMode::Import => f.write_str("import"),
        }
    }
}

/// Per-run state threaded through every plugin's write.
///
/// The mappers accumulate translations as resources are written, so this
/// value must be the same one for the whole run.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Restore or Import.
    pub mode: TransferMode,
    /// ID mappers, keyed by resource name.
    pub mappers: IdMappers,
    /// Business key the snapshot's scope row must carry, if checked.
    pub scope_code: Option<String>,
}

impl TransferConfig {
    /// Creates a configuration for `mode` with no mappers.
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            mappers: IdMappers::new(),
            scope_code: None,
        }
    }

    /// Creates a Restore configuration.
    pub fn restore() -> Self {
        Self::new(TransferMode::Restore)
    }

    /// Creates an Import configuration.
    pub fn import() -> Self {
        Self::new(TransferMode::Import)
    }

    /// Requires the snapshot's scope row to carry `code`.
    pub fn with_scope_code(mut self, code: impl Into<String>) -> Self {
        self.scope_code = Some(code.into());
        self
    }

    /// Registers a mapper for `resource`.
    pub fn with_mapper(mut self, resource: &str, allocation: IdAllocation) -> Self {
        self.mappers.register(resource, allocation);
        self
    }

    /// Returns true in Import mode.
    pub fn is_import(&self) -> bool {
        self.mode == TransferMode::Import
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Per-resource retry policy.
    pub retry: RetryConfig,
}

impl EngineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for retrying a failed resource.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per resource, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add up to 25% random jitter.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a configuration allowing `max_attempts` attempts.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Returns the delay before attempt `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let secs = if self.add_jitter {
            capped + capped * 0.25 * rand::thread_rng().gen::<f64>()
        } else {
            capped
        };
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}
