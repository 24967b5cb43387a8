//! Multi-aggregate units of work.
//!
//! A [`UnitOfWork`] loads every record an operation reads, stages the events
//! the operation decides on, and commits them with one
//! [`EventStore::append_all`] call. Each written stream is checked against the
//! version it had when it was loaded, so a decision made on stale state never
//! reaches the store.

use std::collections::HashMap;

use common::AggregateId;
use event_store::{AppendOptions, CommitId, EventEnvelope, EventStore, StreamAppend, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Rebuilds an aggregate from its stream.
///
/// Returns `None` if the stream is empty.
pub async fn load_aggregate<A, S>(
    store: &S,
    aggregate_id: AggregateId,
) -> Result<Option<A>, DomainError>
where
    A: Aggregate,
    S: EventStore + ?Sized,
{
    let envelopes = store.get_events_for_aggregate(aggregate_id).await?;
    if envelopes.is_empty() {
        return Ok(None);
    }

    let mut aggregate = A::default();
    for envelope in envelopes {
        let version = envelope.version;
        let event: A::Event = serde_json::from_value(envelope.payload)?;
        aggregate.apply(event);
        aggregate.set_version(version);
    }

    Ok(Some(aggregate))
}

struct StagedStream {
    aggregate_id: AggregateId,
    expected: Version,
    events: Vec<EventEnvelope>,
}

/// What a successful commit wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub commit_id: CommitId,
    pub streams: usize,
    pub events: usize,
}

/// Reads and writes of one engine operation.
pub struct UnitOfWork<'a, S: EventStore + ?Sized> {
    store: &'a S,
    operation: &'static str,
    commit_id: CommitId,
    loaded: HashMap<AggregateId, Version>,
    staged: Vec<StagedStream>,
}

impl<'a, S: EventStore + ?Sized> UnitOfWork<'a, S> {
    /// Starts an empty unit of work. `operation` is stored in every event's metadata.
    pub fn begin(store: &'a S, operation: &'static str) -> Self {
        Self {
            store,
            operation,
            commit_id: CommitId::new(),
            loaded: HashMap::new(),
            staged: Vec::new(),
        }
    }

    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    /// Loads an aggregate and remembers the version it was read at.
    ///
    /// Loading the same record again is allowed as long as the store still
    /// reports the same version; otherwise the unit is already stale and a
    /// `ConcurrencyConflict` is returned.
    pub async fn load<A: Aggregate>(
        &mut self,
        aggregate_id: AggregateId,
    ) -> Result<Option<A>, DomainError> {
        let aggregate: Option<A> = load_aggregate(self.store, aggregate_id).await?;
        let version = aggregate
            .as_ref()
            .map(|a| a.version())
            .unwrap_or(Version::initial());

        match self.loaded.get(&aggregate_id) {
            Some(previous) if *previous != version => {
                return Err(event_store::EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected: *previous,
                    actual: version,
                }
                .into());
            }
            Some(_) => {}
            None => {
                self.loaded.insert(aggregate_id, version);
            }
        }

        Ok(aggregate)
    }

    /// Applies `events` to `aggregate` and stages them for the commit.
    ///
    /// The stream is expected, at commit time, to still be at the version the
    /// aggregate had before the first events were staged for it in this unit.
    pub fn record<A: Aggregate>(
        &mut self,
        aggregate: &mut A,
        events: Vec<A::Event>,
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }

        let base_version = aggregate.version();
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = base_version;

        for event in events {
            version = version.next();
            let builder = EventEnvelope::builder()
                .event_type(event.event_type())
                .aggregate_type(A::aggregate_type())
                .version(version)
                .commit_id(self.commit_id)
                .metadata("operation", serde_json::json!(self.operation))
                .payload(&event)?;
            aggregate.apply(event);
            envelopes.push(builder);
        }

        let aggregate_id = aggregate.id().ok_or(DomainError::MissingAggregateId {
            aggregate_type: A::aggregate_type(),
        })?;
        aggregate.set_version(version);

        let envelopes = envelopes
            .into_iter()
            .map(|builder| builder.aggregate_id(aggregate_id).build())
            .collect::<Result<Vec<_>, _>>()?;

        match self
            .staged
            .iter_mut()
            .find(|staged| staged.aggregate_id == aggregate_id)
        {
            Some(staged) => staged.events.extend(envelopes),
            None => self.staged.push(StagedStream {
                aggregate_id,
                expected: base_version,
                events: envelopes,
            }),
        }

        Ok(())
    }

    /// Returns true if nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Number of streams with staged events.
    pub fn staged_streams(&self) -> usize {
        self.staged.len()
    }

    /// Writes every staged event atomically.
    ///
    /// A unit with nothing staged commits trivially without touching the store.
    pub async fn commit(self) -> Result<CommitReceipt, DomainError> {
        let streams = self.staged.len();
        let events: usize = self.staged.iter().map(|s| s.events.len()).sum();

        if streams > 0 {
            let appends = self
                .staged
                .into_iter()
                .map(|staged| {
                    let options = AppendOptions::expect_version(staged.expected);
                    StreamAppend::new(staged.events, options)
                })
                .collect();
            self.store.append_all(appends).await?;
            metrics::counter!("domain_events_committed_total").increment(events as u64);

            tracing::debug!(
                operation = self.operation,
                commit_id = %self.commit_id,
                streams,
                events,
                "unit of work committed"
            );
        }

        Ok(CommitReceipt {
            commit_id: self.commit_id,
            streams,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{Product, ProductStatus};
    use crate::value_objects::Money;
    use common::PartyId;
    use event_store::InMemoryEventStore;

    async fn seed_product(store: &InMemoryEventStore, quantity: u32) -> AggregateId {
        let id = AggregateId::new();
        let mut uow = UnitOfWork::begin(store, "seed");
        let mut product = Product::default();
        let events = product
            .list(
                id,
                PartyId::new(),
                "Desk",
                ProductStatus::ForSale,
                Money::from_cents(100),
                quantity,
                None,
            )
            .unwrap();
        uow.record(&mut product, events).unwrap();
        uow.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn record_and_commit_new_aggregate() {
        let store = InMemoryEventStore::new();
        let id = seed_product(&store, 2).await;

        let product: Product = load_aggregate(&store, id).await.unwrap().unwrap();
        assert_eq!(product.version(), Version::first());
        assert_eq!(product.quantity_available(), 2);

        let events = store.get_events_for_aggregate(id).await.unwrap();
        assert_eq!(
            events[0].metadata.get("operation"),
            Some(&serde_json::json!("seed"))
        );
    }

    #[tokio::test]
    async fn load_missing_returns_none() {
        let store = InMemoryEventStore::new();
        let mut uow = UnitOfWork::begin(&store, "read");
        let product: Option<Product> = uow.load(AggregateId::new()).await.unwrap();
        assert!(product.is_none());
    }

    #[tokio::test]
    async fn stale_unit_fails_without_writing() {
        let store = InMemoryEventStore::new();
        let id = seed_product(&store, 3).await;
        let sale = AggregateId::new();

        let mut first = UnitOfWork::begin(&store, "sell");
        let mut second = UnitOfWork::begin(&store, "sell");
        let mut p1: Product = first.load(id).await.unwrap().unwrap();
        let mut p2: Product = second.load(id).await.unwrap().unwrap();

        let events = p1.sell(sale, 2).unwrap();
        first.record(&mut p1, events).unwrap();
        let events = p2.sell(sale, 2).unwrap();
        second.record(&mut p2, events).unwrap();

        first.commit().await.unwrap();
        let result = second.commit().await;
        assert!(matches!(result, Err(ref e) if e.is_concurrency_conflict()));

        let product: Product = load_aggregate(&store, id).await.unwrap().unwrap();
        assert_eq!(product.quantity_available(), 1);
    }

    #[tokio::test]
    async fn events_in_one_unit_share_a_commit_id() {
        let store = InMemoryEventStore::new();
        let a = seed_product(&store, 1).await;
        let b = seed_product(&store, 1).await;

        let mut uow = UnitOfWork::begin(&store, "attach");
        let commit_id = uow.commit_id();
        let proposal = AggregateId::new();
        for id in [a, b] {
            let mut product: Product = uow.load(id).await.unwrap().unwrap();
            let events = product.attach_exchange(proposal).unwrap();
            uow.record(&mut product, events).unwrap();
        }
        let receipt = uow.commit().await.unwrap();
        assert_eq!(receipt.streams, 2);

        for id in [a, b] {
            let events = store.get_events_for_aggregate(id).await.unwrap();
            assert_eq!(events.last().unwrap().commit_id, commit_id);
        }
    }

    #[tokio::test]
    async fn empty_unit_commits_without_touching_store() {
        let store = InMemoryEventStore::new();
        store.set_unavailable(true);

        let uow = UnitOfWork::begin(&store, "noop");
        let receipt = uow.commit().await.unwrap();
        assert_eq!(receipt.events, 0);
    }

    #[tokio::test]
    async fn repeated_records_extend_one_stream() {
        let store = InMemoryEventStore::new();
        let id = seed_product(&store, 5).await;

        let mut uow = UnitOfWork::begin(&store, "sell");
        let mut product: Product = uow.load(id).await.unwrap().unwrap();
        let events = product.sell(AggregateId::new(), 1).unwrap();
        uow.record(&mut product, events).unwrap();
        let events = product.sell(AggregateId::new(), 1).unwrap();
        uow.record(&mut product, events).unwrap();
        assert_eq!(uow.staged_streams(), 1);
        uow.commit().await.unwrap();

        let product: Product = load_aggregate(&store, id).await.unwrap().unwrap();
        assert_eq!(product.version(), Version::new(3));
        assert_eq!(product.quantity_available(), 3);
    }
}
