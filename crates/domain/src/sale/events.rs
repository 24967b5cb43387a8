//! Sale transaction domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::value_objects::Money;

use super::{FulfillmentStatus, LineItem, PaymentMethod, PaymentStatus};

/// Events that can occur on a sale transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SaleEvent {
    /// Buyer placed the order.
    SalePlaced(SalePlacedData),

    /// Stock for every line was taken from the products.
    StockCommitted(StockCommittedData),

    PaymentStatusChanged(PaymentStatusChangedData),

    FulfillmentStatusChanged(FulfillmentStatusChangedData),
}

impl DomainEvent for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SalePlaced(_) => "SalePlaced",
            SaleEvent::StockCommitted(_) => "StockCommitted",
            SaleEvent::PaymentStatusChanged(_) => "PaymentStatusChanged",
            SaleEvent::FulfillmentStatusChanged(_) => "FulfillmentStatusChanged",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalePlacedData {
    pub sale_id: AggregateId,
    pub buyer: PartyId,
    pub line_items: Vec<LineItem>,

    /// Server-computed total.
    pub total_amount: Money,

    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCommittedData {
    pub committed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusChangedData {
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub changed_by: PartyId,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentStatusChangedData {
    pub from: FulfillmentStatus,
    pub to: FulfillmentStatus,
    pub changed_by: PartyId,
    pub changed_at: DateTime<Utc>,
}

impl SaleEvent {
    pub fn sale_placed(
        sale_id: AggregateId,
        buyer: PartyId,
        line_items: Vec<LineItem>,
        total_amount: Money,
        payment_method: PaymentMethod,
        payment_status: PaymentStatus,
    ) -> Self {
        SaleEvent::SalePlaced(SalePlacedData {
            sale_id,
            buyer,
            line_items,
            total_amount,
            payment_method,
            payment_status,
            placed_at: Utc::now(),
        })
    }

    pub fn stock_committed() -> Self {
        SaleEvent::StockCommitted(StockCommittedData {
            committed_at: Utc::now(),
        })
    }

    pub fn payment_status_changed(
        from: PaymentStatus,
        to: PaymentStatus,
        changed_by: PartyId,
    ) -> Self {
        SaleEvent::PaymentStatusChanged(PaymentStatusChangedData {
            from,
            to,
            changed_by,
            changed_at: Utc::now(),
        })
    }

    pub fn fulfillment_status_changed(
        from: FulfillmentStatus,
        to: FulfillmentStatus,
        changed_by: PartyId,
    ) -> Self {
        SaleEvent::FulfillmentStatusChanged(FulfillmentStatusChangedData {
            from,
            to,
            changed_by,
            changed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sale::OrderLine;

    #[test]
    fn sale_placed_serialization() {
        let seller = PartyId::new();
        let item = OrderLine::new(AggregateId::new(), 2, Money::from_cents(2000)).with_seller(seller);
        let event = SaleEvent::sale_placed(
            AggregateId::new(),
            PartyId::new(),
            vec![item],
            Money::from_cents(4000),
            PaymentMethod::Cash,
            PaymentStatus::Pending,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SalePlaced");
        assert_eq!(json["data"]["payment_method"], "cash");

        let deserialized: SaleEvent = serde_json::from_value(json).unwrap();
        if let SaleEvent::SalePlaced(data) = deserialized {
            assert_eq!(data.line_items, vec![item]);
            assert_eq!(data.total_amount.cents(), 4000);
        } else {
            panic!("Expected SalePlaced event");
        }
    }
}
