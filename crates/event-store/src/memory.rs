use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{EventStore, EventStream, StreamAppend, validate_commit},
};

#[derive(Default)]
struct MemoryState {
    /// All events in commit order.
    events: Vec<EventEnvelope>,
    /// Current version of every stream.
    versions: HashMap<AggregateId, Version>,
}

/// In-memory event store.
///
/// Serves the API binary when no database is configured and backs every test.
/// A single write lock around the whole commit gives `append_all` the same
/// all-or-nothing behaviour as the PostgreSQL transaction.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    state: Arc<RwLock<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }

    /// Makes every commit fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Clears all events.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.events.clear();
        state.versions.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_all(&self, appends: Vec<StreamAppend>) -> Result<Vec<Version>> {
        validate_commit(&appends)?;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }

        let mut state = self.state.write().await;

        // Check every stream before touching any of them.
        for append in &appends {
            let first = &append.events[0];
            let aggregate_id = first.aggregate_id;
            let current = state
                .versions
                .get(&aggregate_id)
                .copied()
                .unwrap_or(Version::initial());

            if let Some(expected) = append.options.expected_version
                && current != expected
            {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual: current,
                });
            }

            if first.version != current.next() {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected: append.options.expected_version.unwrap_or(current),
                    actual: current,
                });
            }
        }

        let mut new_versions = Vec::with_capacity(appends.len());
        for append in appends {
            let aggregate_id = append.events[0].aggregate_id;
            let last_version = append
                .events
                .last()
                .map(|e| e.version)
                .unwrap_or(Version::initial());
            state.versions.insert(aggregate_id, last_version);
            state.events.extend(append.events);
            new_versions.push(last_version);
        }

        metrics::counter!("event_store_commits_total", "backend" => "memory").increment(1);
        Ok(new_versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }

        let state = self.state.read().await;
        let mut events: Vec<_> = state
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.state.read().await.events.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.state.read().await.versions.get(&aggregate_id).copied())
    }
}
