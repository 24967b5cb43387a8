//! Sale transaction aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::value_objects::Money;

use super::{
    FulfillmentStatus, LineItem, OrderLine, PaymentMethod, PaymentStatus, SaleError, SaleEvent,
    events::SalePlacedData, line_item,
};

/// A purchase of one or more products, possibly from several sellers.
#[derive(Debug, Clone, Default)]
pub struct SaleTransaction {
    id: Option<AggregateId>,
    version: Version,
    buyer: PartyId,
    line_items: Vec<LineItem>,
    total_amount: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    fulfillment_status: FulfillmentStatus,

    /// Set once stock for every line has been taken.
    stock_committed: bool,

    placed_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for SaleTransaction {
    type Event = SaleEvent;
    type Error = SaleError;

    fn aggregate_type() -> &'static str {
        "SaleTransaction"
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
            SaleEvent::SalePlaced(data) => self.apply_placed(data),
            SaleEvent::StockCommitted(data) => {
                self.stock_committed = true;
                self.updated_at = Some(data.committed_at);
            }
            SaleEvent::PaymentStatusChanged(data) => {
                self.payment_status = data.to;
                self.updated_at = Some(data.changed_at);
            }
            SaleEvent::FulfillmentStatusChanged(data) => {
                self.fulfillment_status = data.to;
                self.updated_at = Some(data.changed_at);
            }
        }
    }
}

// Query methods
impl SaleTransaction {
    pub fn buyer(&self) -> PartyId {
        self.buyer
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn fulfillment_status(&self) -> FulfillmentStatus {
        self.fulfillment_status
    }

    pub fn stock_committed(&self) -> bool {
        self.stock_committed
    }

    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        self.placed_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns true if the party sells at least one line of this transaction.
    pub fn is_seller(&self, party: PartyId) -> bool {
        self.line_items.iter().any(|item| item.seller == party)
    }

    /// Revenue owed to `seller` from this transaction.
    pub fn seller_subtotal(&self, seller: PartyId) -> Money {
        line_item::seller_subtotal(&self.line_items, seller)
    }

    pub fn seller_subtotals(&self) -> BTreeMap<PartyId, Money> {
        line_item::seller_subtotals(&self.line_items)
    }

    /// Quantity per product, with repeated lines for the same product summed.
    pub fn quantities_by_product(&self) -> BTreeMap<AggregateId, u32> {
        let mut quantities = BTreeMap::new();
        for item in &self.line_items {
            let entry = quantities.entry(item.product_id).or_insert(0u32);
            *entry = entry.saturating_add(item.quantity);
        }
        quantities
    }
}

// Command methods (return events)
impl SaleTransaction {
    /// Checks a buyer's order before anything is loaded or written.
    ///
    /// Returns the recomputed total on success.
    pub fn validate_order(
        lines: &[OrderLine],
        declared_total: Money,
        initial_status: PaymentStatus,
    ) -> Result<Money, SaleError> {
        if lines.is_empty() {
            return Err(SaleError::NoLineItems);
        }

        for line in lines {
            if line.quantity == 0 {
                return Err(SaleError::InvalidQuantity {
                    product_id: line.product_id,
                });
            }
            if line.unit_price.is_negative() {
                return Err(SaleError::NegativePrice {
                    product_id: line.product_id,
                    cents: line.unit_price.cents(),
                });
            }
        }

        if !initial_status.is_valid_initial() {
            return Err(SaleError::InvalidInitialPaymentStatus {
                status: initial_status,
            });
        }

        let computed = line_item::order_total(lines.iter().map(|l| (l.quantity, l.unit_price)))
            .ok_or(SaleError::TotalOverflow)?;

        if computed != declared_total {
            return Err(SaleError::TotalMismatch {
                declared: declared_total,
                computed,
            });
        }

        Ok(computed)
    }

    /// Places the sale with lines already annotated with their sellers.
    pub fn place(
        &self,
        sale_id: AggregateId,
        buyer: PartyId,
        line_items: Vec<LineItem>,
        declared_total: Money,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Result<Vec<SaleEvent>, SaleError> {
        if self.id.is_some() {
            return Err(SaleError::AlreadyPlaced);
        }

        let lines: Vec<OrderLine> = line_items
            .iter()
            .map(|item| OrderLine::new(item.product_id, item.quantity, item.unit_price))
            .collect();
        let total = Self::validate_order(&lines, declared_total, payment_status)?;

        Ok(vec![SaleEvent::sale_placed(
            sale_id,
            buyer,
            line_items,
            total,
            payment_method,
            payment_status,
        )])
    }

    /// Marks the stock as taken. Allowed once, and only after payment completed.
    pub fn commit_stock(&self) -> Result<Vec<SaleEvent>, SaleError> {
        self.ensure_placed()?;
        if self.stock_committed {
            return Err(SaleError::StockAlreadyCommitted);
        }
        if self.payment_status != PaymentStatus::Completed {
            return Err(SaleError::PaymentNotCompleted {
                status: self.payment_status,
            });
        }
        Ok(vec![SaleEvent::stock_committed()])
    }

    /// Moves the payment status. Repeating `completed` returns no events.
    pub fn set_payment_status(
        &self,
        acting_party: PartyId,
        new_status: PaymentStatus,
    ) -> Result<Vec<SaleEvent>, SaleError> {
        self.ensure_seller(acting_party)?;

        if self.payment_status == PaymentStatus::Completed && new_status == PaymentStatus::Completed
        {
            return Ok(vec![]);
        }

        if !self.payment_status.can_transition_to(new_status) {
            return Err(SaleError::InvalidPaymentTransition {
                from: self.payment_status,
                to: new_status,
            });
        }

        Ok(vec![SaleEvent::payment_status_changed(
            self.payment_status,
            new_status,
            acting_party,
        )])
    }

    /// Moves the fulfillment status. Repeating the current status returns no events.
    pub fn set_fulfillment_status(
        &self,
        acting_party: PartyId,
        new_status: FulfillmentStatus,
    ) -> Result<Vec<SaleEvent>, SaleError> {
        self.ensure_seller(acting_party)?;

        if self.fulfillment_status == new_status {
            return Ok(vec![]);
        }

        if !self.fulfillment_status.can_transition_to(new_status) {
            return Err(SaleError::InvalidFulfillmentTransition {
                from: self.fulfillment_status,
                to: new_status,
            });
        }

        Ok(vec![SaleEvent::fulfillment_status_changed(
            self.fulfillment_status,
            new_status,
            acting_party,
        )])
    }
}

// Helpers
impl SaleTransaction {
    fn ensure_placed(&self) -> Result<(), SaleError> {
        if self.id.is_none() {
            return Err(SaleError::NotPlaced);
        }
        Ok(())
    }

    fn ensure_seller(&self, party: PartyId) -> Result<(), SaleError> {
        self.ensure_placed()?;
        if !self.is_seller(party) {
            return Err(SaleError::NotSeller { party });
        }
        Ok(())
    }

    fn apply_placed(&mut self, data: SalePlacedData) {
        self.id = Some(data.sale_id);
        self.buyer = data.buyer;
        self.line_items = data.line_items;
        self.total_amount = data.total_amount;
        self.payment_method = data.payment_method;
        self.payment_status = data.payment_status;
        self.fulfillment_status = FulfillmentStatus::Pending;
        self.placed_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }
}
