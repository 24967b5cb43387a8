//! Versioned event streams for the marketplace engine.
//!
//! Every product, offer and sale is an event stream keyed by [`AggregateId`].
//! Streams carry a monotonically increasing [`Version`]; writers state the
//! version they read and the store rejects the write if the stream moved on.
//! [`EventStore::append_all`] applies that check to several streams at once
//! and appends everything or nothing, which is what the consistency engine
//! builds its units of work on.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{CommitId, EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, StreamAppend};
