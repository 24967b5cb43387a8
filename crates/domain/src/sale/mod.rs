//! Sale transactions: orders, payment state and per-seller revenue.

mod aggregate;
mod events;
mod line_item;
mod state;

pub use aggregate::SaleTransaction;
pub use events::{
    FulfillmentStatusChangedData, PaymentStatusChangedData, SaleEvent, SalePlacedData,
    StockCommittedData,
};
pub use line_item::{LineItem, OrderLine, order_total, seller_subtotal, seller_subtotals};
pub use state::{FulfillmentStatus, PaymentMethod, PaymentStatus};

use common::{AggregateId, PartyId};
use thiserror::Error;

use crate::value_objects::Money;

/// Errors that can occur during sale operations.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("Sale already placed")]
    AlreadyPlaced,

    #[error("Sale does not exist")]
    NotPlaced,

    #[error("Sale has no line items")]
    NoLineItems,

    #[error("Invalid quantity for product {product_id} (must be at least 1)")]
    InvalidQuantity { product_id: AggregateId },

    #[error("Invalid price for product {product_id}: {cents} (must not be negative)")]
    NegativePrice { product_id: AggregateId, cents: i64 },

    #[error("Sale total overflows")]
    TotalOverflow,

    #[error("Declared total {declared} does not match computed total {computed}")]
    TotalMismatch { declared: Money, computed: Money },

    #[error("A sale cannot start with payment status {status}")]
    InvalidInitialPaymentStatus { status: PaymentStatus },

    #[error("Party {party} sells nothing in this transaction")]
    NotSeller { party: PartyId },

    #[error("Invalid payment transition: {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Invalid fulfillment transition: {from} -> {to}")]
    InvalidFulfillmentTransition {
        from: FulfillmentStatus,
        to: FulfillmentStatus,
    },

    #[error("Stock already committed")]
    StockAlreadyCommitted,

    #[error("Stock can only be committed for completed payments (status {status})")]
    PaymentNotCompleted { status: PaymentStatus },
}
