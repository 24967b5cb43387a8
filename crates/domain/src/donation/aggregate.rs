//! Donation request aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, PartyId};
use event_store::Version;

use crate::aggregate::Aggregate;

use super::{
    DonationError, DonationEvent, DonationStatus, RejectionReason, events::DonationRequestedData,
};

/// A request to receive a product for free.
#[derive(Debug, Clone, Default)]
pub struct DonationRequest {
    id: Option<AggregateId>,
    version: Version,
    product: AggregateId,
    donated_by: PartyId,
    donated_to: PartyId,
    status: DonationStatus,
    message: Option<String>,
    requested_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    rejection: Option<RejectionReason>,
}

impl Aggregate for DonationRequest {
    type Event = DonationEvent;
    type Error = DonationError;

    fn aggregate_type() -> &'static str {
        "DonationRequest"
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
            DonationEvent::DonationRequested(data) => self.apply_requested(data),
            DonationEvent::DonationAccepted(data) => {
                self.status = DonationStatus::Accepted;
                self.resolved_at = Some(data.accepted_at);
            }
            DonationEvent::DonationRejected(data) => {
                self.status = DonationStatus::Rejected;
                self.resolved_at = Some(data.rejected_at);
                self.rejection = Some(data.reason);
            }
        }
    }
}

// Query methods
impl DonationRequest {
    pub fn product(&self) -> AggregateId {
        self.product
    }

    /// The requester.
    pub fn donated_by(&self) -> PartyId {
        self.donated_by
    }

    /// The owner at the time of the request.
    pub fn donated_to(&self) -> PartyId {
        self.donated_to
    }

    pub fn status(&self) -> DonationStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn requested_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        self.rejection
    }
}

// Command methods (return events)
impl DonationRequest {
    pub fn request(
        &self,
        request_id: AggregateId,
        product: AggregateId,
        donated_by: PartyId,
        donated_to: PartyId,
        message: Option<String>,
    ) -> Result<Vec<DonationEvent>, DonationError> {
        if self.id.is_some() {
            return Err(DonationError::AlreadyRequested);
        }
        if donated_by == donated_to {
            return Err(DonationError::SelfDonation);
        }

        Ok(vec![DonationEvent::donation_requested(
            request_id, product, donated_by, donated_to, message,
        )])
    }

    /// Accepts the request. Only the owner it was addressed to may accept.
    pub fn accept(&self, acting_party: PartyId) -> Result<Vec<DonationEvent>, DonationError> {
        self.ensure_owner(acting_party, "accept")?;
        self.ensure_pending()?;
        Ok(vec![DonationEvent::donation_accepted()])
    }

    /// Turns the request down.
    pub fn reject(&self, acting_party: PartyId) -> Result<Vec<DonationEvent>, DonationError> {
        self.ensure_owner(acting_party, "reject")?;
        self.ensure_pending()?;
        Ok(vec![DonationEvent::donation_rejected(
            RejectionReason::ByOwner,
        )])
    }

    /// Rejects the request because a competing one was accepted.
    pub fn reject_superseded(
        &self,
        accepted_request: AggregateId,
    ) -> Result<Vec<DonationEvent>, DonationError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![DonationEvent::donation_rejected(
            RejectionReason::OtherRequestAccepted {
                request_id: accepted_request,
            },
        )])
    }

    /// Rejects the request because the product left its owner through an exchange.
    pub fn reject_for_transfer(
        &self,
        product_id: AggregateId,
    ) -> Result<Vec<DonationEvent>, DonationError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![DonationEvent::donation_rejected(
            RejectionReason::ProductTransferred { product_id },
        )])
    }

    /// Rejects the request because the product sold out.
    pub fn reject_for_sell_out(
        &self,
        product_id: AggregateId,
    ) -> Result<Vec<DonationEvent>, DonationError> {
        self.ensure_created()?;
        self.ensure_pending()?;
        Ok(vec![DonationEvent::donation_rejected(
            RejectionReason::ProductSoldOut { product_id },
        )])
    }
}

// Helpers
impl DonationRequest {
    fn ensure_created(&self) -> Result<(), DonationError> {
        if self.id.is_none() {
            return Err(DonationError::NotRequested);
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<(), DonationError> {
        if !self.status.is_pending() {
            return Err(DonationError::NotPending {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_owner(&self, party: PartyId, action: &'static str) -> Result<(), DonationError> {
        self.ensure_created()?;
        if self.donated_to != party {
            return Err(DonationError::NotAuthorized { party, action });
        }
        Ok(())
    }

    fn apply_requested(&mut self, data: DonationRequestedData) {
        self.id = Some(data.request_id);
        self.product = data.product;
        self.donated_by = data.donated_by;
        self.donated_to = data.donated_to;
        self.message = data.message;
        self.status = DonationStatus::Pending;
        self.requested_at = Some(data.requested_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested() -> (DonationRequest, PartyId, PartyId) {
        let requester = PartyId::new();
        let owner = PartyId::new();
        let mut request = DonationRequest::default();
        let events = request
            .request(AggregateId::new(), AggregateId::new(), requester, owner, None)
            .unwrap();
        request.apply_events(events);
        (request, requester, owner)
    }

    #[test]
    fn request_donation() {
        let (request, requester, owner) = requested();
        assert_eq!(request.status(), DonationStatus::Pending);
        assert_eq!(request.donated_by(), requester);
        assert_eq!(request.donated_to(), owner);
    }

    #[test]
    fn cannot_request_own_product() {
        let party = PartyId::new();
        let result = DonationRequest::default().request(
            AggregateId::new(),
            AggregateId::new(),
            party,
            party,
            None,
        );
        assert!(matches!(result, Err(DonationError::SelfDonation)));
    }

    #[test]
    fn only_owner_resolves() {
        let (request, requester, owner) = requested();
        assert!(matches!(
            request.accept(requester),
            Err(DonationError::NotAuthorized { .. })
        ));
        assert!(request.accept(owner).is_ok());
        assert!(request.reject(owner).is_ok());
    }

    #[test]
    fn superseded_request_is_rejected_with_reason() {
        let (mut request, _, _) = requested();
        let winner = AggregateId::new();
        let events = request.reject_superseded(winner).unwrap();
        request.apply_events(events);

        assert_eq!(request.status(), DonationStatus::Rejected);
        assert_eq!(
            request.rejection(),
            Some(RejectionReason::OtherRequestAccepted { request_id: winner })
        );
    }

    #[test]
    fn resolved_request_cannot_change() {
        let (mut request, _, owner) = requested();
        let events = request.accept(owner).unwrap();
        request.apply_events(events);

        assert!(matches!(
            request.reject(owner),
            Err(DonationError::NotPending {
                status: DonationStatus::Accepted
            })
        ));
    }
}
