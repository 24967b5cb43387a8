//! Product aggregate implementation.

use std::collections::BTreeSet;

use common::{AggregateId, PartyId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::value_objects::{GeoPoint, Money};

use super::{
    ProductError, ProductEvent, ProductStatus, TransferCause,
    events::{ListingUpdatedData, ProductListedData, StockSoldData},
};

/// A listed item and the inventory record behind it.
///
/// Besides the listing itself the product tracks the exchange proposals and
/// donation requests still open against it. An offer is detached in the same
/// commit that closes it. The sets are cleared outright when the product
/// changes hands or sells out, since every open offer is closed in that commit.
#[derive(Debug, Clone, Default)]
pub struct Product {
    id: Option<AggregateId>,
    version: Version,

    owner: PartyId,
    title: String,
    status: ProductStatus,
    unit_price: Money,
    quantity_available: u32,
    location: Option<GeoPoint>,
    pending_exchanges: BTreeSet<AggregateId>,
    pending_donations: BTreeSet<AggregateId>,
}

impl Aggregate for Product {
    type Event = ProductEvent;
    type Error = ProductError;

    fn aggregate_type() -> &'static str {
        "Product"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            ProductEvent::ProductListed(data) => self.apply_listed(data),
            ProductEvent::ListingUpdated(data) => self.apply_listing_updated(data),
            ProductEvent::ExchangeAttached(data) => {
                self.pending_exchanges.insert(data.proposal_id);
            }
            ProductEvent::DonationAttached(data) => {
                self.pending_donations.insert(data.request_id);
            }
            ProductEvent::ExchangeDetached(data) => {
                self.pending_exchanges.remove(&data.proposal_id);
            }
            ProductEvent::DonationDetached(data) => {
                self.pending_donations.remove(&data.request_id);
            }
            ProductEvent::OwnershipTransferred(data) => {
                self.owner = data.to;
                self.status = ProductStatus::Unavailable;
                self.pending_exchanges.clear();
                self.pending_donations.clear();
            }
            ProductEvent::StockSold(data) => self.apply_stock_sold(data),
        }
    }
}

// Query methods
impl Product {
    pub fn owner(&self) -> PartyId {
        self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> ProductStatus {
        self.status
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity_available(&self) -> u32 {
        self.quantity_available
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.location
    }

    /// Exchange proposals still open against this product.
    pub fn pending_exchanges(&self) -> impl Iterator<Item = AggregateId> + '_ {
        self.pending_exchanges.iter().copied()
    }

    /// Donation requests still open against this product.
    pub fn pending_donations(&self) -> impl Iterator<Item = AggregateId> + '_ {
        self.pending_donations.iter().copied()
    }

    pub fn is_owned_by(&self, party: PartyId) -> bool {
        self.owner == party
    }

    /// True when the last unit has been taken.
    pub fn is_sold_out(&self) -> bool {
        self.status == ProductStatus::Unavailable && self.quantity_available == 0
    }
}

// Command methods (return events)
impl Product {
    /// Lists a new product.
    #[allow(clippy::too_many_arguments)]
    pub fn list(
        &self,
        product_id: AggregateId,
        owner: PartyId,
        title: impl Into<String>,
        status: ProductStatus,
        unit_price: Money,
        quantity: u32,
        location: Option<GeoPoint>,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        if self.id.is_some() {
            return Err(ProductError::AlreadyListed);
        }

        let title = title.into();
        Self::validate_listing(&title, status, unit_price, quantity)?;

        Ok(vec![ProductEvent::product_listed(
            product_id, owner, title, status, unit_price, quantity, location,
        )])
    }

    /// Applies an owner edit. Fields left as `None` keep their current value.
    ///
    /// Returns no events when nothing changes.
    pub fn update_listing(
        &self,
        acting_party: PartyId,
        title: Option<String>,
        status: Option<ProductStatus>,
        unit_price: Option<Money>,
        quantity: Option<u32>,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        if !self.is_owned_by(acting_party) {
            return Err(ProductError::NotOwner {
                party: acting_party,
            });
        }

        let title = title.unwrap_or_else(|| self.title.clone());
        let status = status.unwrap_or(self.status);
        let unit_price = unit_price.unwrap_or(self.unit_price);
        let quantity = quantity.unwrap_or(self.quantity_available);

        Self::validate_listing(&title, status, unit_price, quantity)?;

        if title == self.title
            && status == self.status
            && unit_price == self.unit_price
            && quantity == self.quantity_available
        {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::listing_updated(
            title, status, unit_price, quantity,
        )])
    }

    /// Records that an exchange proposal references this product.
    pub fn attach_exchange(
        &self,
        proposal_id: AggregateId,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        Ok(vec![ProductEvent::exchange_attached(proposal_id)])
    }

    /// Records that a donation request references this product.
    pub fn attach_donation(
        &self,
        request_id: AggregateId,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        Ok(vec![ProductEvent::donation_attached(request_id)])
    }

    /// Closes a proposal's claim on this product. No-op if it is not attached.
    pub fn detach_exchange(
        &self,
        proposal_id: AggregateId,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        if !self.pending_exchanges.contains(&proposal_id) {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::exchange_detached(proposal_id)])
    }

    /// Closes a donation request's claim on this product. No-op if it is not attached.
    pub fn detach_donation(
        &self,
        request_id: AggregateId,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        if !self.pending_donations.contains(&request_id) {
            return Ok(vec![]);
        }
        Ok(vec![ProductEvent::donation_detached(request_id)])
    }

    /// Hands the product to `new_owner`, provided `expected_owner` still holds
    /// it and it has not been sold out or withdrawn.
    pub fn transfer(
        &self,
        expected_owner: PartyId,
        new_owner: PartyId,
        cause: TransferCause,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        if self.status == ProductStatus::Unavailable || self.quantity_available == 0 {
            return Err(ProductError::NotTransferable {
                status: self.status,
                quantity: self.quantity_available,
            });
        }
        if self.owner != expected_owner {
            return Err(ProductError::OwnerChanged {
                expected: expected_owner,
                actual: self.owner,
            });
        }

        Ok(vec![ProductEvent::ownership_transferred(
            self.owner, new_owner, cause,
        )])
    }

    /// Takes `quantity` units out of stock for a sale.
    pub fn sell(
        &self,
        sale_id: AggregateId,
        quantity: u32,
    ) -> Result<Vec<ProductEvent>, ProductError> {
        self.ensure_listed()?;
        if quantity == 0 {
            return Err(ProductError::InvalidQuantity { quantity });
        }
        if self.is_sold_out() {
            return Err(ProductError::InsufficientStock {
                requested: quantity,
                available: 0,
            });
        }
        if !self.status.can_sell() {
            return Err(ProductError::NotForSale {
                status: self.status,
            });
        }

        let remaining = self.quantity_available.checked_sub(quantity).ok_or(
            ProductError::InsufficientStock {
                requested: quantity,
                available: self.quantity_available,
            },
        )?;

        Ok(vec![ProductEvent::stock_sold(sale_id, quantity, remaining)])
    }
}

// Helpers
impl Product {
    fn ensure_listed(&self) -> Result<(), ProductError> {
        if self.id.is_none() {
            return Err(ProductError::NotListed);
        }
        Ok(())
    }

    fn validate_listing(
        title: &str,
        status: ProductStatus,
        unit_price: Money,
        quantity: u32,
    ) -> Result<(), ProductError> {
        if title.trim().is_empty() {
            return Err(ProductError::TitleRequired);
        }
        if unit_price.is_negative() {
            return Err(ProductError::NegativePrice {
                cents: unit_price.cents(),
            });
        }
        if quantity == 0 && status.requires_stock() {
            return Err(ProductError::OutOfStockMustBeUnavailable { status });
        }
        Ok(())
    }

    fn apply_listed(&mut self, data: ProductListedData) {
        self.id = Some(data.product_id);
        self.owner = data.owner;
        self.title = data.title;
        self.status = data.status;
        self.unit_price = data.unit_price;
        self.quantity_available = data.quantity;
        self.location = data.location;
    }

    fn apply_listing_updated(&mut self, data: ListingUpdatedData) {
        self.title = data.title;
        self.status = data.status;
        self.unit_price = data.unit_price;
        self.quantity_available = data.quantity;
    }

    fn apply_stock_sold(&mut self, data: StockSoldData) {
        self.quantity_available = data.remaining;
        if data.remaining == 0 {
            self.status = ProductStatus::Unavailable;
            self.pending_exchanges.clear();
            self.pending_donations.clear();
        }
    }
}
