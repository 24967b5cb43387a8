//! Donation request domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a donation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DonationEvent {
    DonationRequested(DonationRequestedData),
    DonationAccepted(DonationAcceptedData),
    DonationRejected(DonationRejectedData),
}

impl DomainEvent for DonationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DonationEvent::DonationRequested(_) => "DonationRequested",
            DonationEvent::DonationAccepted(_) => "DonationAccepted",
            DonationEvent::DonationRejected(_) => "DonationRejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationRequestedData {
    pub request_id: AggregateId,
    pub product: AggregateId,

    /// The party asking for the product.
    pub donated_by: PartyId,

    /// The owner giving the product away.
    pub donated_to: PartyId,

    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationAcceptedData {
    pub accepted_at: DateTime<Utc>,
}

/// Why a request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The owner turned it down.
    ByOwner,

    /// The owner accepted a competing request for the same product.
    OtherRequestAccepted { request_id: AggregateId },

    /// The product changed hands through an exchange.
    ProductTransferred { product_id: AggregateId },

    /// The product sold its last unit.
    ProductSoldOut { product_id: AggregateId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationRejectedData {
    pub reason: RejectionReason,
    pub rejected_at: DateTime<Utc>,
}

impl DonationEvent {
    pub fn donation_requested(
        request_id: AggregateId,
        product: AggregateId,
        donated_by: PartyId,
        donated_to: PartyId,
        message: Option<String>,
    ) -> Self {
        DonationEvent::DonationRequested(DonationRequestedData {
            request_id,
            product,
            donated_by,
            donated_to,
            message,
            requested_at: Utc::now(),
        })
    }

    pub fn donation_accepted() -> Self {
        DonationEvent::DonationAccepted(DonationAcceptedData {
            accepted_at: Utc::now(),
        })
    }

    pub fn donation_rejected(reason: RejectionReason) -> Self {
        DonationEvent::DonationRejected(DonationRejectedData {
            reason,
            rejected_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types() {
        assert_eq!(
            DonationEvent::donation_accepted().event_type(),
            "DonationAccepted"
        );
        assert_eq!(
            DonationEvent::donation_rejected(RejectionReason::ByOwner).event_type(),
            "DonationRejected"
        );
    }

    #[test]
    fn requested_serialization_keeps_message() {
        let event = DonationEvent::donation_requested(
            AggregateId::new(),
            AggregateId::new(),
            PartyId::new(),
            PartyId::new(),
            Some("I can pick it up today".to_string()),
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: DonationEvent = serde_json::from_str(&json).unwrap();
        if let DonationEvent::DonationRequested(data) = deserialized {
            assert_eq!(data.message.as_deref(), Some("I can pick it up today"));
        } else {
            panic!("Expected DonationRequested event");
        }
    }
}
