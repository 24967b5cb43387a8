//! Product aggregate: the listing, its owner and its stock.

mod aggregate;
mod events;
mod state;

pub use aggregate::Product;
pub use events::{
    DonationAttachedData, DonationDetachedData, ExchangeAttachedData, ExchangeDetachedData,
    ListingUpdatedData, OwnershipTransferredData, ProductEvent, ProductListedData, StockSoldData,
    TransferCause,
};
pub use state::ProductStatus;

use common::PartyId;
use thiserror::Error;

/// Errors that can occur during product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("Product already listed")]
    AlreadyListed,

    #[error("Product is not listed")]
    NotListed,

    #[error("Title is required")]
    TitleRequired,

    #[error("Invalid price: {cents} (must not be negative)")]
    NegativePrice { cents: i64 },

    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// A product with no stock left can only be listed as unavailable.
    #[error("Product with zero quantity cannot be {status}")]
    OutOfStockMustBeUnavailable { status: ProductStatus },

    #[error("Party {party} does not own this product")]
    NotOwner { party: PartyId },

    /// The product changed hands since the decision was made.
    #[error("Product owner changed: expected {expected}, found {actual}")]
    OwnerChanged { expected: PartyId, actual: PartyId },

    #[error("Product is not for sale (status {status})")]
    NotForSale { status: ProductStatus },

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    #[error("Product cannot be handed over (status {status}, quantity {quantity})")]
    NotTransferable { status: ProductStatus, quantity: u32 },
}
