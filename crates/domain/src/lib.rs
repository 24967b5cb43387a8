//! Domain layer for the marketplace consistency engine.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for event-sourced records
//! - The Product, ExchangeProposal, DonationRequest and SaleTransaction aggregates
//! - UnitOfWork, which commits events for several aggregates all-or-nothing

pub mod aggregate;
pub mod donation;
pub mod error;
pub mod exchange;
pub mod product;
pub mod sale;
pub mod unit_of_work;
pub mod value_objects;

pub use aggregate::{Aggregate, DomainEvent};
pub use donation::{DonationError, DonationEvent, DonationRequest, DonationStatus, RejectionReason};
pub use error::{DomainError, UnknownVariant};
pub use exchange::{
    CancellationReason, ExchangeError, ExchangeEvent, ExchangeProposal, ExchangeStatus,
};
pub use product::{Product, ProductError, ProductEvent, ProductStatus, TransferCause};
pub use sale::{
    FulfillmentStatus, LineItem, OrderLine, PaymentMethod, PaymentStatus, SaleError, SaleEvent,
    SaleTransaction, order_total, seller_subtotal, seller_subtotals,
};
pub use unit_of_work::{CommitReceipt, UnitOfWork, load_aggregate};
pub use value_objects::{GeoPoint, Money};
