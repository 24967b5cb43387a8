//! Engine error types.

use std::fmt;

use common::{AggregateId, PartyId};
use domain::{DomainError, DonationError, ExchangeError, ProductError, SaleError};
use event_store::EventStoreError;
use thiserror::Error;
use uuid::Uuid;

/// Reason attached to a `Conflict` when retries ran out.
pub const CONCURRENT_MODIFICATION: &str = "concurrent_modification";

pub(crate) const PRODUCT: &str = "product";
pub(crate) const EXCHANGE_PROPOSAL: &str = "exchange_proposal";
pub(crate) const DONATION_REQUEST: &str = "donation_request";
pub(crate) const SALE_TRANSACTION: &str = "sale_transaction";
pub(crate) const PARTY: &str = "party";

/// Failures an engine operation reports to its caller.
///
/// Whatever the variant, nothing of the failed operation was written.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request is malformed or breaks a rule that needs no stored state.
    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The stored state no longer allows the operation.
    #[error("Conflict on {entity} {id}: {reason}")]
    Conflict {
        entity: &'static str,
        id: Uuid,
        reason: String,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: AggregateId,
        requested: u32,
        available: u32,
    },

    #[error("Party {party} is not allowed to do this: {reason}")]
    Unauthorized { party: PartyId, reason: String },

    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Storage could not be reached. Safe to retry.
    #[error("Service unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Coarse classification of an [`EngineError`], stable for callers and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    InsufficientStock,
    Unauthorized,
    InvalidTransition,
    Unavailable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation { .. } => ErrorKind::Validation,
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            EngineError::Unauthorized { .. } => ErrorKind::Unauthorized,
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Unavailable { .. })
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation {
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        EngineError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn conflict(
        entity: &'static str,
        id: impl Into<Uuid>,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::Conflict {
            entity,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unauthorized(party: PartyId, reason: impl Into<String>) -> Self {
        EngineError::Unauthorized {
            party,
            reason: reason.into(),
        }
    }

    /// Maps a product rule violation, naming the product it happened on.
    pub(crate) fn product(product_id: AggregateId, err: ProductError) -> Self {
        match err {
            ProductError::NotListed => Self::not_found(PRODUCT, product_id),
            ProductError::AlreadyListed
            | ProductError::OwnerChanged { .. }
            | ProductError::NotTransferable { .. }
            | ProductError::NotForSale { .. } => {
                Self::conflict(PRODUCT, product_id, err.to_string())
            }
            ProductError::TitleRequired
            | ProductError::NegativePrice { .. }
            | ProductError::InvalidQuantity { .. }
            | ProductError::OutOfStockMustBeUnavailable { .. } => Self::validation(err.to_string()),
            ProductError::NotOwner { party } => Self::unauthorized(party, err.to_string()),
            ProductError::InsufficientStock {
                requested,
                available,
            } => EngineError::InsufficientStock {
                product_id,
                requested,
                available,
            },
        }
    }

    pub(crate) fn exchange(proposal_id: AggregateId, err: ExchangeError) -> Self {
        match err {
            ExchangeError::NotProposed => Self::not_found(EXCHANGE_PROPOSAL, proposal_id),
            ExchangeError::AlreadyProposed | ExchangeError::NotPending { .. } => {
                Self::conflict(EXCHANGE_PROPOSAL, proposal_id, err.to_string())
            }
            ExchangeError::SameProduct | ExchangeError::SelfExchange => {
                Self::validation(err.to_string())
            }
            ExchangeError::NotAuthorized { party, .. } => {
                Self::unauthorized(party, err.to_string())
            }
        }
    }

    pub(crate) fn donation(request_id: AggregateId, err: DonationError) -> Self {
        match err {
            DonationError::NotRequested => Self::not_found(DONATION_REQUEST, request_id),
            DonationError::AlreadyRequested | DonationError::NotPending { .. } => {
                Self::conflict(DONATION_REQUEST, request_id, err.to_string())
            }
            DonationError::SelfDonation => Self::validation(err.to_string()),
            DonationError::NotAuthorized { party, .. } => {
                Self::unauthorized(party, err.to_string())
            }
        }
    }

    pub(crate) fn sale(sale_id: AggregateId, err: SaleError) -> Self {
        match err {
            SaleError::NotPlaced => Self::not_found(SALE_TRANSACTION, sale_id),
            SaleError::AlreadyPlaced
            | SaleError::StockAlreadyCommitted
            | SaleError::PaymentNotCompleted { .. } => {
                Self::conflict(SALE_TRANSACTION, sale_id, err.to_string())
            }
            SaleError::NoLineItems
            | SaleError::InvalidQuantity { .. }
            | SaleError::NegativePrice { .. }
            | SaleError::TotalOverflow
            | SaleError::TotalMismatch { .. }
            | SaleError::InvalidInitialPaymentStatus { .. } => Self::validation(err.to_string()),
            SaleError::NotSeller { party } => Self::unauthorized(party, err.to_string()),
            SaleError::InvalidPaymentTransition { from, to } => EngineError::InvalidTransition {
                entity: "payment_status",
                from: from.to_string(),
                to: to.to_string(),
            },
            SaleError::InvalidFulfillmentTransition { from, to } => {
                EngineError::InvalidTransition {
                    entity: "fulfillment_status",
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
        }
    }
}

impl From<EventStoreError> for EngineError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::ConcurrencyConflict { aggregate_id, .. } => {
                Self::conflict("record", aggregate_id, CONCURRENT_MODIFICATION)
            }
            other => EngineError::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::EventStore(err) => err.into(),
            DomainError::Serialization(_) | DomainError::MissingAggregateId { .. } => {
                EngineError::Unavailable {
                    reason: err.to_string(),
                }
            }
            rule => Self::validation(rule.to_string()),
        }
    }
}

/// Convenience type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
