//! Projection processor for feeding events to projections.

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

struct Registered {
    projection: Box<dyn Projection>,
    position: ProjectionPosition,
}

/// Feeds the global event log to registered projections.
///
/// Each projection has its own position in the log. Catch-up streams the log
/// from the start and hands every event past a projection's position to it
/// (if it subscribes to the event's aggregate type). Catch-ups are serialized,
/// so two callers racing to refresh a view never deliver an event twice.
///
/// A position counts events, so the log must only ever grow at its end. Both
/// stores make commits visible in the order they were appended.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Mutex<Vec<Registered>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Mutex::new(Vec::new()),
        }
    }

    /// Registers a projection at position zero.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.get_mut().push(Registered {
            projection,
            position: ProjectionPosition::zero(),
        });
    }

    pub async fn projection_count(&self) -> usize {
        self.projections.lock().await.len()
    }

    /// Position of the named projection, if registered.
    pub async fn position(&self, name: &str) -> Option<ProjectionPosition> {
        self.projections
            .lock()
            .await
            .iter()
            .find(|r| r.projection.name() == name)
            .map(|r| r.position)
    }

    /// Brings every projection up to the end of the log.
    ///
    /// Returns how many events were handed to projections. A failing
    /// projection stops the catch-up; its position stays before the failed
    /// event, so the next catch-up retries it.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut projections = self.projections.lock().await;
        self.catch_up(&mut projections).await
    }

    /// Resets every projection and replays the whole log.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        let mut projections = self.projections.lock().await;
        for registered in projections.iter_mut() {
            registered.projection.reset().await?;
            registered.position = ProjectionPosition::zero();
        }
        self.catch_up(&mut projections).await
    }

    async fn catch_up(&self, projections: &mut [Registered]) -> Result<u64> {
        let mut stream = self.store.stream_all_events().await?;
        let mut index: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            index += 1;

            for registered in projections.iter_mut() {
                if registered.position.events_seen >= index {
                    continue;
                }
                if registered.projection.subscribes_to(&event.aggregate_type) {
                    registered.projection.handle(&event).await?;
                    metrics::counter!(
                        "projections_events_processed",
                        "projection" => registered.projection.name()
                    )
                    .increment(1);
                    delivered += 1;
                }
                registered.position = registered.position.advance();
            }
        }

        if delivered > 0 {
            tracing::info!(log_length = index, delivered, "catch-up complete");
        } else {
            tracing::debug!(log_length = index, "projections already up to date");
        }

        Ok(delivered)
    }
}
