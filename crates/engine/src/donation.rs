//! Donation requests and their resolution.

use std::collections::BTreeSet;
use std::time::Instant;

use common::AggregateId;
use domain::{
    DonationEvent, DonationRequest, DonationStatus, Product, TransferCause, UnitOfWork,
};
use event_store::EventStore;

use crate::cascade::Cascade;
use crate::commands::{DonationResolution, RequestDonation, ResolveDonation};
use crate::engine::{ConsistencyEngine, observe};
use crate::error::{DONATION_REQUEST, EngineError, PRODUCT};
use crate::retry::AttemptError;
use crate::services::{Notification, NotificationEmitter, NotificationKind, PartyDirectory};

impl<S, P, N> ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    /// Asks the owner of a product listed for donation to give it away.
    #[tracing::instrument(
        skip(self, cmd),
        fields(request_id = %cmd.request_id, product_id = %cmd.product_id)
    )]
    pub async fn request_donation(
        &self,
        cmd: RequestDonation,
    ) -> Result<DonationRequest, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "request_donation",
                DONATION_REQUEST,
                cmd.request_id.into(),
                || self.try_request_donation(cmd),
            )
            .await;
        observe("request_donation", started, &result);

        let request = result?;
        tracing::info!("donation requested");
        self.notify(vec![Notification::new(
            request.donated_to(),
            NotificationKind::DonationRequested,
            serde_json::json!({
                "request_id": cmd.request_id,
                "product_id": request.product(),
                "requester": request.donated_by(),
                "message": request.message(),
            }),
        )])
        .await;
        Ok(request)
    }

    async fn try_request_donation(
        &self,
        cmd: &RequestDonation,
    ) -> Result<DonationRequest, AttemptError> {
        self.ensure_party_exists(cmd.requester).await?;

        let mut uow = UnitOfWork::begin(&self.store, "request_donation");
        let mut product: Product = uow
            .load(cmd.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found(PRODUCT, cmd.product_id))?;

        if !product.status().can_donate() {
            return Err(EngineError::conflict(
                PRODUCT,
                cmd.product_id,
                format!("product is {}", product.status()),
            )
            .into());
        }
        if product.is_owned_by(cmd.requester) {
            return Err(EngineError::validation("owner cannot request their own product").into());
        }

        let mut request = DonationRequest::default();
        let events = request
            .request(
                cmd.request_id,
                cmd.product_id,
                cmd.requester,
                product.owner(),
                cmd.message.clone(),
            )
            .map_err(|e| EngineError::donation(cmd.request_id, e))?;
        uow.record(&mut request, events)?;

        let events = product
            .attach_donation(cmd.request_id)
            .map_err(|e| EngineError::product(cmd.product_id, e))?;
        uow.record(&mut product, events)?;

        uow.commit().await?;
        Ok(request)
    }

    /// Accepts or rejects a donation request. Only the owner it was addressed
    /// to may resolve it.
    ///
    /// Acceptance hands the product to the requester, makes it unavailable,
    /// rejects every other pending request for it and cancels every pending
    /// exchange proposal touching it, all in one commit.
    #[tracing::instrument(
        skip(self, cmd),
        fields(request_id = %cmd.request_id, status = %cmd.status, acting_party = %cmd.acting_party)
    )]
    pub async fn resolve_donation(
        &self,
        cmd: ResolveDonation,
    ) -> Result<DonationResolution, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "resolve_donation",
                DONATION_REQUEST,
                cmd.request_id.into(),
                || self.try_resolve_donation(cmd),
            )
            .await;
        observe("resolve_donation", started, &result);

        let (resolution, cascade_notifications) = result?;
        tracing::info!(
            rejected = resolution.rejected_requests.len(),
            cancelled_proposals = resolution.cancelled_proposals.len(),
            "donation resolved"
        );

        let mut notifications = vec![Notification::new(
            resolution.request.donated_by(),
            NotificationKind::DonationResolved,
            serde_json::json!({
                "request_id": cmd.request_id,
                "status": resolution.request.status(),
            }),
        )];
        notifications.extend(cascade_notifications);
        self.notify(notifications).await;

        Ok(resolution)
    }

    async fn try_resolve_donation(
        &self,
        cmd: &ResolveDonation,
    ) -> Result<(DonationResolution, Vec<Notification>), AttemptError> {
        let mut uow = UnitOfWork::begin(&self.store, "resolve_donation");
        let mut request: DonationRequest = uow
            .load(cmd.request_id)
            .await?
            .ok_or_else(|| EngineError::not_found(DONATION_REQUEST, cmd.request_id))?;

        let events = match cmd.status {
            DonationStatus::Pending => {
                return Err(EngineError::InvalidTransition {
                    entity: DONATION_REQUEST,
                    from: request.status().to_string(),
                    to: cmd.status.to_string(),
                }
                .into());
            }
            DonationStatus::Accepted => request.accept(cmd.acting_party),
            DonationStatus::Rejected => request.reject(cmd.acting_party),
        }
        .map_err(|e| EngineError::donation(cmd.request_id, e))?;

        let mut cascade = Cascade::holding([request.product()]);
        let product = if cmd.status == DonationStatus::Accepted {
            let product =
                give_away(&mut uow, cmd.request_id, &mut request, events, &mut cascade).await?;
            Some(product)
        } else {
            uow.record(&mut request, events)?;
            let product_id = request.product();
            if let Some(mut product) = uow.load::<Product>(product_id).await? {
                let events = product
                    .detach_donation(cmd.request_id)
                    .map_err(|e| EngineError::product(product_id, e))?;
                uow.record(&mut product, events)?;
            }
            None
        };

        uow.commit().await?;

        let Cascade {
            cancelled_proposals,
            rejected_donations,
            notifications,
            ..
        } = cascade;
        Ok((
            DonationResolution {
                request,
                product,
                rejected_requests: rejected_donations,
                cancelled_proposals,
            },
            notifications,
        ))
    }
}

/// Stages the accepted donation: closes every other offer on the product, then
/// records the acceptance and transfers the product to the requester.
async fn give_away<S: EventStore + ?Sized>(
    uow: &mut UnitOfWork<'_, S>,
    request_id: AggregateId,
    request: &mut DonationRequest,
    accept_events: Vec<DonationEvent>,
    cascade: &mut Cascade,
) -> Result<Product, AttemptError> {
    let product_id = request.product();
    let mut product: Product = uow
        .load(product_id)
        .await?
        .ok_or_else(|| EngineError::not_found(PRODUCT, product_id))?;

    let competing: BTreeSet<AggregateId> = product
        .pending_donations()
        .filter(|id| *id != request_id)
        .collect();
    cascade
        .reject_donations(uow, competing, |other| other.reject_superseded(request_id))
        .await?;

    let proposals: BTreeSet<AggregateId> = product.pending_exchanges().collect();
    cascade
        .cancel_proposals(uow, proposals, |proposal| {
            proposal.cancel_for_transfer(product_id)
        })
        .await?;

    uow.record(request, accept_events)?;

    let events = product
        .transfer(
            request.donated_to(),
            request.donated_by(),
            TransferCause::Donation { request_id },
        )
        .map_err(|e| EngineError::product(product_id, e))?;
    uow.record(&mut product, events)?;

    Ok(product)
}
