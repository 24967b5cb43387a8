//! Whole-operation retry on version conflicts.

use std::future::Future;
use std::time::Duration;

use domain::DomainError;
use event_store::EventStoreError;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{CONCURRENT_MODIFICATION, EngineError};

/// Outcome of a single attempt.
///
/// `Stale` means a record changed between load and commit; the attempt wrote
/// nothing and may be run again from scratch.
#[derive(Debug)]
pub(crate) enum AttemptError {
    Stale(EventStoreError),
    Failed(EngineError),
}

impl From<EngineError> for AttemptError {
    fn from(err: EngineError) -> Self {
        AttemptError::Failed(err)
    }
}

impl From<DomainError> for AttemptError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EventStore(err @ EventStoreError::ConcurrencyConflict { .. }) => {
                AttemptError::Stale(err)
            }
            other => AttemptError::Failed(other.into()),
        }
    }
}

/// How often an operation is re-run after losing a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs `attempt` until it succeeds, fails for a reason other than a
    /// version conflict, or the attempts are used up.
    ///
    /// Exhaustion is reported as a `Conflict` on `entity`/`id` with reason
    /// `concurrent_modification`.
    pub(crate) async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        entity: &'static str,
        id: Uuid,
        mut attempt: F,
    ) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Failed(err)) => return Err(err),
                Err(AttemptError::Stale(source)) => {
                    metrics::counter!("engine_commit_conflicts_total", "operation" => operation)
                        .increment(1);

                    if tries >= self.max_attempts {
                        tracing::warn!(
                            operation,
                            attempts = tries,
                            error = %source,
                            "giving up after repeated version conflicts"
                        );
                        return Err(EngineError::Conflict {
                            entity,
                            id,
                            reason: CONCURRENT_MODIFICATION.to_string(),
                        });
                    }

                    tracing::warn!(
                        operation,
                        attempt = tries,
                        error = %source,
                        "version conflict, retrying operation"
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff * tries).await;
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RetryPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff)
    }
}
