//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Retry settings for engine operations.
///
/// Reads from environment variables:
/// - `ENGINE_MAX_ATTEMPTS`: attempts per operation before a version conflict
///   is reported (default: `5`)
/// - `ENGINE_RETRY_BACKOFF_MS`: base pause between attempts (default: `5`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl EngineConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: std::env::var("ENGINE_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|attempts: &u32| *attempts > 0)
                .unwrap_or(defaults.max_attempts),
            retry_backoff: std::env::var("ENGINE_RETRY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(5),
        }
    }
}
