//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::donation::DonationError;
use crate::exchange::ExchangeError;
use crate::product::ProductError;
use crate::sale::SaleError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Donation error: {0}")]
    Donation(#[from] DonationError),

    #[error("Sale error: {0}")]
    Sale(#[from] SaleError),

    /// Events were recorded against an aggregate that has no identity.
    #[error("Cannot record events for an aggregate without an id ({aggregate_type})")]
    MissingAggregateId { aggregate_type: &'static str },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if this error is an optimistic-concurrency conflict.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. })
        )
    }
}

/// A string that names no member of the enum it was parsed as.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
