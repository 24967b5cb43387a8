//! Product domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::{GeoPoint, Money};

use super::ProductStatus;

/// Events that can occur on a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was put on the marketplace.
    ProductListed(ProductListedData),

    /// Owner edited the listing.
    ListingUpdated(ListingUpdatedData),

    /// An exchange proposal now references this product.
    ExchangeAttached(ExchangeAttachedData),

    /// A donation request now references this product.
    DonationAttached(DonationAttachedData),

    /// A proposal referencing this product was closed.
    ExchangeDetached(ExchangeDetachedData),

    /// A donation request referencing this product was closed.
    DonationDetached(DonationDetachedData),

    /// Product changed hands through an exchange or a donation.
    OwnershipTransferred(OwnershipTransferredData),

    /// Stock was taken by a completed sale.
    StockSold(StockSoldData),
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductListed(_) => "ProductListed",
            ProductEvent::ListingUpdated(_) => "ListingUpdated",
            ProductEvent::ExchangeAttached(_) => "ExchangeAttached",
            ProductEvent::DonationAttached(_) => "DonationAttached",
            ProductEvent::ExchangeDetached(_) => "ExchangeDetached",
            ProductEvent::DonationDetached(_) => "DonationDetached",
            ProductEvent::OwnershipTransferred(_) => "OwnershipTransferred",
            ProductEvent::StockSold(_) => "StockSold",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListedData {
    pub product_id: AggregateId,
    pub owner: PartyId,
    pub title: String,
    pub status: ProductStatus,
    pub unit_price: Money,
    pub quantity: u32,
    pub location: Option<GeoPoint>,
    pub listed_at: DateTime<Utc>,
}

/// Data for ListingUpdated event.
///
/// Carries the full listing after the edit, not just the changed fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingUpdatedData {
    pub title: String,
    pub status: ProductStatus,
    pub unit_price: Money,
    pub quantity: u32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeAttachedData {
    pub proposal_id: AggregateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationAttachedData {
    pub request_id: AggregateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeDetachedData {
    pub proposal_id: AggregateId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationDetachedData {
    pub request_id: AggregateId,
}

/// What moved the product to its new owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferCause {
    Exchange { proposal_id: AggregateId },
    Donation { request_id: AggregateId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipTransferredData {
    pub from: PartyId,
    pub to: PartyId,
    pub cause: TransferCause,
    pub transferred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSoldData {
    pub sale_id: AggregateId,
    pub quantity: u32,

    /// Quantity left after this sale.
    pub remaining: u32,
}

impl ProductEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn product_listed(
        product_id: AggregateId,
        owner: PartyId,
        title: String,
        status: ProductStatus,
        unit_price: Money,
        quantity: u32,
        location: Option<GeoPoint>,
    ) -> Self {
        ProductEvent::ProductListed(ProductListedData {
            product_id,
            owner,
            title,
            status,
            unit_price,
            quantity,
            location,
            listed_at: Utc::now(),
        })
    }

    pub fn listing_updated(
        title: String,
        status: ProductStatus,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        ProductEvent::ListingUpdated(ListingUpdatedData {
            title,
            status,
            unit_price,
            quantity,
            updated_at: Utc::now(),
        })
    }

    pub fn exchange_attached(proposal_id: AggregateId) -> Self {
        ProductEvent::ExchangeAttached(ExchangeAttachedData { proposal_id })
    }

    pub fn donation_attached(request_id: AggregateId) -> Self {
        ProductEvent::DonationAttached(DonationAttachedData { request_id })
    }

    pub fn exchange_detached(proposal_id: AggregateId) -> Self {
        ProductEvent::ExchangeDetached(ExchangeDetachedData { proposal_id })
    }

    pub fn donation_detached(request_id: AggregateId) -> Self {
        ProductEvent::DonationDetached(DonationDetachedData { request_id })
    }

    pub fn ownership_transferred(from: PartyId, to: PartyId, cause: TransferCause) -> Self {
        ProductEvent::OwnershipTransferred(OwnershipTransferredData {
            from,
            to,
            cause,
            transferred_at: Utc::now(),
        })
    }

    pub fn stock_sold(sale_id: AggregateId, quantity: u32, remaining: u32) -> Self {
        ProductEvent::StockSold(StockSoldData {
            sale_id,
            quantity,
            remaining,
        })
    }
}
