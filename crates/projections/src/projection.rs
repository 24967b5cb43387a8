//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// How far into the global event log a projection has been fed.
///
/// Counts every event of the log, including the ones the projection does not
/// subscribe to, so positions of different projections are comparable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition {
    pub events_seen: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self { events_seen: 0 }
    }

    pub fn advance(&self) -> Self {
        Self {
            events_seen: self.events_seen + 1,
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.events_seen)
    }
}

/// A projection folds events of some aggregate types into a read model.
///
/// The processor owns positions and decides which events a projection sees;
/// `handle` is only called for events whose aggregate type is listed in
/// [`Projection::aggregate_types`], each at most once between resets.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    /// Aggregate types whose events this projection consumes.
    fn aggregate_types(&self) -> &'static [&'static str];

    /// Folds one event into the read model.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Drops everything the read model holds.
    async fn reset(&self) -> Result<()>;

    fn subscribes_to(&self, aggregate_type: &str) -> bool {
        self.aggregate_types().contains(&aggregate_type)
    }
}
