//! Engine operation inputs and results.

use std::collections::BTreeMap;

use common::{AggregateId, PartyId};
use domain::{
    DonationRequest, DonationStatus, ExchangeProposal, ExchangeStatus, FulfillmentStatus,
    GeoPoint, Money, OrderLine, PaymentMethod, PaymentStatus, Product, ProductStatus,
    SaleTransaction,
};

/// Creates a listing.
#[derive(Debug, Clone)]
pub struct ListProduct {
    /// Id of the new product, chosen by the caller.
    pub product_id: AggregateId,
    pub owner: PartyId,
    pub title: String,
    pub status: ProductStatus,
    pub unit_price: Money,
    pub quantity: u32,
    pub location: Option<GeoPoint>,
}

impl ListProduct {
    /// Creates a ListProduct command with a generated product ID.
    pub fn new(
        owner: PartyId,
        title: impl Into<String>,
        status: ProductStatus,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            product_id: AggregateId::new(),
            owner,
            title: title.into(),
            status,
            unit_price,
            quantity,
            location: None,
        }
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// The owner's edit path. `None` fields are left as they are.
#[derive(Debug, Clone)]
pub struct UpdateListing {
    pub product_id: AggregateId,
    pub acting_party: PartyId,
    pub title: Option<String>,
    pub status: Option<ProductStatus>,
    pub unit_price: Option<Money>,
    pub quantity: Option<u32>,
}

impl UpdateListing {
    pub fn new(product_id: AggregateId, acting_party: PartyId) -> Self {
        Self {
            product_id,
            acting_party,
            title: None,
            status: None,
            unit_price: None,
            quantity: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn status(mut self, status: ProductStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn unit_price(mut self, unit_price: Money) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProposeExchange {
    pub proposal_id: AggregateId,
    pub product_offered: AggregateId,
    pub product_requested: AggregateId,
    pub proposer: PartyId,
}

impl ProposeExchange {
    pub fn new(
        product_offered: AggregateId,
        product_requested: AggregateId,
        proposer: PartyId,
    ) -> Self {
        Self {
            proposal_id: AggregateId::new(),
            product_offered,
            product_requested,
            proposer,
        }
    }
}

/// Moves a pending proposal to `accepted`, `rejected` or `cancelled`.
#[derive(Debug, Clone)]
pub struct ResolveExchange {
    pub proposal_id: AggregateId,
    pub status: ExchangeStatus,
    pub acting_party: PartyId,
}

impl ResolveExchange {
    pub fn new(proposal_id: AggregateId, status: ExchangeStatus, acting_party: PartyId) -> Self {
        Self {
            proposal_id,
            status,
            acting_party,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeResolution {
    pub proposal: ExchangeProposal,

    /// Other proposals cancelled because they shared a product.
    pub cancelled_proposals: Vec<AggregateId>,

    /// Donation requests rejected because their product changed hands.
    pub rejected_donations: Vec<AggregateId>,

    /// Offered and requested product after the swap; only set on acceptance.
    pub products: Option<(Product, Product)>,
}

#[derive(Debug, Clone)]
pub struct RequestDonation {
    pub request_id: AggregateId,
    pub product_id: AggregateId,
    pub requester: PartyId,
    pub message: Option<String>,
}

impl RequestDonation {
    pub fn new(product_id: AggregateId, requester: PartyId) -> Self {
        Self {
            request_id: AggregateId::new(),
            product_id,
            requester,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ResolveDonation {
    pub request_id: AggregateId,
    pub status: DonationStatus,
    pub acting_party: PartyId,
}

impl ResolveDonation {
    pub fn new(request_id: AggregateId, status: DonationStatus, acting_party: PartyId) -> Self {
        Self {
            request_id,
            status,
            acting_party,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DonationResolution {
    pub request: DonationRequest,

    /// The transferred product; only set on acceptance.
    pub product: Option<Product>,

    pub rejected_requests: Vec<AggregateId>,
    pub cancelled_proposals: Vec<AggregateId>,
}

/// A buyer's order.
#[derive(Debug, Clone)]
pub struct PlaceSale {
    pub sale_id: AggregateId,
    pub buyer: PartyId,
    pub lines: Vec<OrderLine>,

    /// Total the client computed. Checked against the engine's own sum.
    pub declared_total: Money,

    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
}

impl PlaceSale {
    pub fn new(
        buyer: PartyId,
        lines: Vec<OrderLine>,
        declared_total: Money,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Self {
        Self {
            sale_id: AggregateId::new(),
            buyer,
            lines,
            declared_total,
            payment_method,
            payment_status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SalePlacement {
    pub transaction: SaleTransaction,
    pub seller_subtotals: BTreeMap<PartyId, Money>,
}

#[derive(Debug, Clone)]
pub struct SetPaymentStatus {
    pub sale_id: AggregateId,
    pub status: PaymentStatus,
    pub acting_party: PartyId,
}

impl SetPaymentStatus {
    pub fn new(sale_id: AggregateId, status: PaymentStatus, acting_party: PartyId) -> Self {
        Self {
            sale_id,
            status,
            acting_party,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetFulfillmentStatus {
    pub sale_id: AggregateId,
    pub status: FulfillmentStatus,
    pub acting_party: PartyId,
}

impl SetFulfillmentStatus {
    pub fn new(sale_id: AggregateId, status: FulfillmentStatus, acting_party: PartyId) -> Self {
        Self {
            sale_id,
            status,
            acting_party,
        }
    }
}
