//! Exchange proposal aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{
    CancellationReason, ExchangeError, ExchangeEvent, ExchangeStatus,
    events::ExchangeProposedData,
};

/// A barter offer: "my product for yours".
#[derive(Debug, Clone, Default)]
pub struct ExchangeProposal {
    id: Option<AggregateId>,
    version: Version,
    product_offered: AggregateId,
    product_requested: AggregateId,
    proposer: PartyId,
    recipient: PartyId,
    status: ExchangeStatus,
    created_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    cancellation: Option<CancellationReason>,
}

impl Aggregate for ExchangeProposal {
    type Event = ExchangeEvent;
    type Error = ExchangeError;

    fn aggregate_type() -> &'static str {
        "ExchangeProposal"
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
            ExchangeEvent::ExchangeProposed(data) => self.apply_proposed(data),
            ExchangeEvent::ExchangeAccepted(data) => {
                self.status = ExchangeStatus::Accepted;
                self.resolved_at = Some(data.accepted_at);
            }
            ExchangeEvent::ExchangeRejected(data) => {
                self.status = ExchangeStatus::Rejected;
                self.resolved_at = Some(data.rejected_at);
            }
            ExchangeEvent::ExchangeCancelled(data) => {
                self.status = ExchangeStatus::Cancelled;
                self.resolved_at = Some(data.cancelled_at);
                self.cancellation = Some(data.reason);
            }
        }
    }
}

// Query methods
impl ExchangeProposal {
    pub fn product_offered(&self) -> AggregateId {
        self.product_offered
    }

    pub fn product_requested(&self) -> AggregateId {
        self.product_requested
    }

    pub fn proposer(&self) -> PartyId {
        self.proposer
    }

    pub fn recipient(&self) -> PartyId {
        self.recipient
    }

    pub fn status(&self) -> ExchangeStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn cancellation(&self) -> Option<CancellationReason> {
        self.cancellation
    }

    /// Returns true if the product appears on either side of the proposal.
    pub fn involves(&self, product_id: AggregateId) -> bool {
        self.product_offered == product_id || self.product_requested == product_id
    }

    pub fn is_party(&self, party: PartyId) -> bool {
        self.proposer == party || self.recipient == party
    }
}

// Command methods (return events)
impl ExchangeProposal {
    pub fn propose(
        &self,
        proposal_id: AggregateId,
        product_offered: AggregateId,
        product_requested: AggregateId,
        proposer: PartyId,
        recipient: PartyId,
    ) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        if self.id.is_some() {
            return Err(ExchangeError::AlreadyProposed);
        }
        if product_offered == product_requested {
            return Err(ExchangeError::SameProduct);
        }
        if proposer == recipient {
            return Err(ExchangeError::SelfExchange);
        }

        Ok(vec![ExchangeEvent::exchange_proposed(
            proposal_id,
            product_offered,
            product_requested,
            proposer,
            recipient,
        )])
    }

    /// Accepts the proposal. Only the recipient may accept.
    pub fn accept(&self, acting_party: PartyId) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_recipient(acting_party, "accept")?;
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_accepted()])
    }

    /// Rejects the proposal. Only the recipient may reject.
    pub fn reject(&self, acting_party: PartyId) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_recipient(acting_party, "reject")?;
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_rejected()])
    }

    /// Withdraws the proposal. Either party may cancel.
    pub fn cancel(&self, acting_party: PartyId) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_created()?;
        if !self.is_party(acting_party) {
            return Err(ExchangeError::NotAuthorized {
                party: acting_party,
                action: "cancel",
            });
        }
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_cancelled(
            CancellationReason::ByParty {
                party: acting_party,
            },
        )])
    }

    /// Cancels the proposal because another one sharing a product was accepted.
    pub fn supersede(
        &self,
        accepted_proposal: AggregateId,
    ) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_cancelled(
            CancellationReason::SupersededBy {
                proposal_id: accepted_proposal,
            },
        )])
    }

    /// Cancels the proposal because one of its products was given away.
    pub fn cancel_for_transfer(
        &self,
        product_id: AggregateId,
    ) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_cancelled(
            CancellationReason::ProductTransferred { product_id },
        )])
    }

    /// Cancels the proposal because one of its products sold out.
    pub fn cancel_for_sell_out(
        &self,
        product_id: AggregateId,
    ) -> Result<Vec<ExchangeEvent>, ExchangeError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![ExchangeEvent::exchange_cancelled(
            CancellationReason::ProductSoldOut { product_id },
        )])
    }
}

// Helpers
impl ExchangeProposal {
    fn ensure_created(&self) -> Result<(), ExchangeError> {
        if self.id.is_none() {
            return Err(ExchangeError::NotProposed);
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), ExchangeError> {
        if !self.status.is_pending() {
            return Err(ExchangeError::NotPending {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_recipient(&self, party: PartyId, action: &'static str) -> Result<(), ExchangeError> {
        self.ensure_created()?;
        if self.recipient != party {
            return Err(ExchangeError::NotAuthorized { party, action });
        }
        Ok(())
    }

    fn apply_proposed(&mut self, data: ExchangeProposedData) {
        self.id = Some(data.proposal_id);
        self.product_offered = data.product_offered;
        self.product_requested = data.product_requested;
        self.proposer = data.proposer;
        self.recipient = data.recipient;
        self.status = ExchangeStatus::Pending;
        self.created_at = Some(data.proposed_at);
    }
}
