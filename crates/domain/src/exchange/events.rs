//! Exchange proposal domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on an exchange proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExchangeEvent {
    ExchangeProposed(ExchangeProposedData),
    ExchangeAccepted(ExchangeAcceptedData),
    ExchangeRejected(ExchangeRejectedData),
    ExchangeCancelled(ExchangeCancelledData),
}

impl DomainEvent for ExchangeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExchangeEvent::ExchangeProposed(_) => "ExchangeProposed",
            ExchangeEvent::ExchangeAccepted(_) => "ExchangeAccepted",
            ExchangeEvent::ExchangeRejected(_) => "ExchangeRejected",
            ExchangeEvent::ExchangeCancelled(_) => "ExchangeCancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeProposedData {
    pub proposal_id: AggregateId,
    pub product_offered: AggregateId,
    pub product_requested: AggregateId,

    /// Owner of the offered product.
    pub proposer: PartyId,

    /// Owner of the requested product.
    pub recipient: PartyId,

    pub proposed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeAcceptedData {
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRejectedData {
    pub rejected_at: DateTime<Utc>,
}

/// Why a proposal was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CancellationReason {
    /// One of the two parties withdrew.
    ByParty { party: PartyId },

    /// Another proposal sharing a product was accepted.
    SupersededBy { proposal_id: AggregateId },

    /// A product in the proposal was donated away.
    ProductTransferred { product_id: AggregateId },

    /// A product in the proposal sold its last unit.
    ProductSoldOut { product_id: AggregateId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCancelledData {
    pub reason: CancellationReason,
    pub cancelled_at: DateTime<Utc>,
}

impl ExchangeEvent {
    pub fn exchange_proposed(
        proposal_id: AggregateId,
        product_offered: AggregateId,
        product_requested: AggregateId,
        proposer: PartyId,
        recipient: PartyId,
    ) -> Self {
        ExchangeEvent::ExchangeProposed(ExchangeProposedData {
            proposal_id,
            product_offered,
            product_requested,
            proposer,
            recipient,
            proposed_at: Utc::now(),
        })
    }

    pub fn exchange_accepted() -> Self {
        ExchangeEvent::ExchangeAccepted(ExchangeAcceptedData {
            accepted_at: Utc::now(),
        })
    }

    pub fn exchange_rejected() -> Self {
        ExchangeEvent::ExchangeRejected(ExchangeRejectedData {
            rejected_at: Utc::now(),
        })
    }

    pub fn exchange_cancelled(reason: CancellationReason) -> Self {
        ExchangeEvent::ExchangeCancelled(ExchangeCancelledData {
            reason,
            cancelled_at: Utc::now(),
        })
    }
}
