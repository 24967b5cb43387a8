//! Exchange proposals and their resolution.

use std::collections::BTreeSet;
use std::time::Instant;

use common::AggregateId;
use domain::{ExchangeEvent, ExchangeProposal, ExchangeStatus, Product, TransferCause, UnitOfWork};
use event_store::EventStore;

use crate::cascade::Cascade;
use crate::commands::{ExchangeResolution, ProposeExchange, ResolveExchange};
use crate::engine::{ConsistencyEngine, observe};
use crate::error::{EXCHANGE_PROPOSAL, EngineError, PRODUCT};
use crate::retry::AttemptError;
use crate::services::{Notification, NotificationEmitter, NotificationKind, PartyDirectory};

impl<S, P, N> ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    /// Offers one product for another.
    ///
    /// The proposal is attached to both products in the same commit, so any
    /// later resolution touching either product sees it.
    #[tracing::instrument(
        skip(self, cmd),
        fields(proposal_id = %cmd.proposal_id, proposer = %cmd.proposer)
    )]
    pub async fn propose_exchange(
        &self,
        cmd: ProposeExchange,
    ) -> Result<ExchangeProposal, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "propose_exchange",
                EXCHANGE_PROPOSAL,
                cmd.proposal_id.into(),
                || self.try_propose_exchange(cmd),
            )
            .await;
        observe("propose_exchange", started, &result);

        let proposal = result?;
        tracing::info!("exchange proposed");
        self.notify(vec![Notification::new(
            proposal.recipient(),
            NotificationKind::ExchangeProposed,
            serde_json::json!({
                "proposal_id": cmd.proposal_id,
                "product_offered": proposal.product_offered(),
                "product_requested": proposal.product_requested(),
                "proposer": proposal.proposer(),
            }),
        )])
        .await;
        Ok(proposal)
    }

    async fn try_propose_exchange(
        &self,
        cmd: &ProposeExchange,
    ) -> Result<ExchangeProposal, AttemptError> {
        if cmd.product_offered == cmd.product_requested {
            return Err(EngineError::validation("a product cannot be exchanged for itself").into());
        }

        let mut uow = UnitOfWork::begin(&self.store, "propose_exchange");
        let mut offered: Product = uow
            .load(cmd.product_offered)
            .await?
            .ok_or_else(|| EngineError::not_found(PRODUCT, cmd.product_offered))?;
        let mut requested: Product = uow
            .load(cmd.product_requested)
            .await?
            .ok_or_else(|| EngineError::not_found(PRODUCT, cmd.product_requested))?;

        if !offered.is_owned_by(cmd.proposer) {
            return Err(EngineError::unauthorized(
                cmd.proposer,
                format!("party does not own offered product {}", cmd.product_offered),
            )
            .into());
        }
        if requested.is_owned_by(cmd.proposer) {
            return Err(
                EngineError::validation("the requested product already belongs to the proposer")
                    .into(),
            );
        }
        if !requested.status().can_be_requested_in_exchange() {
            return Err(EngineError::conflict(
                PRODUCT,
                cmd.product_requested,
                format!("requested product is {}", requested.status()),
            )
            .into());
        }
        if !offered.status().can_be_offered() {
            return Err(EngineError::conflict(
                PRODUCT,
                cmd.product_offered,
                format!("offered product is {}", offered.status()),
            )
            .into());
        }

        let mut proposal = ExchangeProposal::default();
        let events = proposal
            .propose(
                cmd.proposal_id,
                cmd.product_offered,
                cmd.product_requested,
                cmd.proposer,
                requested.owner(),
            )
            .map_err(|e| EngineError::exchange(cmd.proposal_id, e))?;
        uow.record(&mut proposal, events)?;

        for (product_id, product) in [
            (cmd.product_offered, &mut offered),
            (cmd.product_requested, &mut requested),
        ] {
            let events = product
                .attach_exchange(cmd.proposal_id)
                .map_err(|e| EngineError::product(product_id, e))?;
            uow.record(product, events)?;
        }

        uow.commit().await?;
        Ok(proposal)
    }

    /// Moves a pending proposal to `accepted`, `rejected` or `cancelled`.
    ///
    /// Acceptance swaps the owners of both products, makes both unavailable,
    /// cancels every other pending proposal on either product and rejects
    /// every pending donation request on either product, all in one commit.
    #[tracing::instrument(
        skip(self, cmd),
        fields(proposal_id = %cmd.proposal_id, status = %cmd.status, acting_party = %cmd.acting_party)
    )]
    pub async fn resolve_exchange(
        &self,
        cmd: ResolveExchange,
    ) -> Result<ExchangeResolution, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "resolve_exchange",
                EXCHANGE_PROPOSAL,
                cmd.proposal_id.into(),
                || self.try_resolve_exchange(cmd),
            )
            .await;
        observe("resolve_exchange", started, &result);

        let (resolution, cascade_notifications) = result?;
        tracing::info!(
            cancelled = resolution.cancelled_proposals.len(),
            rejected_donations = resolution.rejected_donations.len(),
            "exchange resolved"
        );

        let proposal = &resolution.proposal;
        let mut notifications: Vec<Notification> = [proposal.proposer(), proposal.recipient()]
            .into_iter()
            .map(|party| {
                Notification::new(
                    party,
                    NotificationKind::ExchangeResolved,
                    serde_json::json!({
                        "proposal_id": cmd.proposal_id,
                        "status": proposal.status(),
                    }),
                )
            })
            .collect();
        notifications.extend(cascade_notifications);
        self.notify(notifications).await;

        Ok(resolution)
    }

    async fn try_resolve_exchange(
        &self,
        cmd: &ResolveExchange,
    ) -> Result<(ExchangeResolution, Vec<Notification>), AttemptError> {
        let mut uow = UnitOfWork::begin(&self.store, "resolve_exchange");
        let mut proposal: ExchangeProposal = uow
            .load(cmd.proposal_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EXCHANGE_PROPOSAL, cmd.proposal_id))?;

        let events = match cmd.status {
            ExchangeStatus::Pending => {
                return Err(EngineError::InvalidTransition {
                    entity: EXCHANGE_PROPOSAL,
                    from: proposal.status().to_string(),
                    to: cmd.status.to_string(),
                }
                .into());
            }
            ExchangeStatus::Accepted => proposal.accept(cmd.acting_party),
            ExchangeStatus::Rejected => proposal.reject(cmd.acting_party),
            ExchangeStatus::Cancelled => proposal.cancel(cmd.acting_party),
        }
        .map_err(|e| EngineError::exchange(cmd.proposal_id, e))?;

        let mut cascade =
            Cascade::holding([proposal.product_offered(), proposal.product_requested()]);
        let products = if cmd.status == ExchangeStatus::Accepted {
            let products =
                swap_products(&mut uow, cmd.proposal_id, &mut proposal, events, &mut cascade)
                    .await?;
            Some(products)
        } else {
            uow.record(&mut proposal, events)?;
            release_products(&mut uow, cmd.proposal_id, &proposal).await?;
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
            ExchangeResolution {
                proposal,
                cancelled_proposals,
                rejected_donations,
                products,
            },
            notifications,
        ))
    }
}

/// Detaches a rejected or cancelled proposal from both of its products.
async fn release_products<S: EventStore + ?Sized>(
    uow: &mut UnitOfWork<'_, S>,
    proposal_id: AggregateId,
    proposal: &ExchangeProposal,
) -> Result<(), AttemptError> {
    for product_id in [proposal.product_offered(), proposal.product_requested()] {
        let Some(mut product) = uow.load::<Product>(product_id).await? else {
            continue;
        };
        let events = product
            .detach_exchange(proposal_id)
            .map_err(|e| EngineError::product(product_id, e))?;
        uow.record(&mut product, events)?;
    }
    Ok(())
}

/// Stages the accepted swap: closes competing offers on both products, then
/// records the acceptance and hands each product to the other party.
async fn swap_products<S: EventStore + ?Sized>(
    uow: &mut UnitOfWork<'_, S>,
    proposal_id: AggregateId,
    proposal: &mut ExchangeProposal,
    accept_events: Vec<ExchangeEvent>,
    cascade: &mut Cascade,
) -> Result<(Product, Product), AttemptError> {
    let offered_id = proposal.product_offered();
    let requested_id = proposal.product_requested();

    let mut offered: Product = uow
        .load(offered_id)
        .await?
        .ok_or_else(|| EngineError::not_found(PRODUCT, offered_id))?;
    let mut requested: Product = uow
        .load(requested_id)
        .await?
        .ok_or_else(|| EngineError::not_found(PRODUCT, requested_id))?;

    let competing: BTreeSet<AggregateId> = offered
        .pending_exchanges()
        .chain(requested.pending_exchanges())
        .filter(|id| *id != proposal_id)
        .collect();
    cascade
        .cancel_proposals(uow, competing, |other| other.supersede(proposal_id))
        .await?;

    let donations: BTreeSet<AggregateId> = offered
        .pending_donations()
        .chain(requested.pending_donations())
        .collect();
    cascade
        .reject_donations(uow, donations, |request| {
            request.reject_for_transfer(request.product())
        })
        .await?;

    uow.record(proposal, accept_events)?;

    let cause = TransferCause::Exchange { proposal_id };
    let events = offered
        .transfer(proposal.proposer(), proposal.recipient(), cause)
        .map_err(|e| EngineError::product(offered_id, e))?;
    uow.record(&mut offered, events)?;

    let events = requested
        .transfer(proposal.recipient(), proposal.proposer(), cause)
        .map_err(|e| EngineError::product(requested_id, e))?;
    uow.record(&mut requested, events)?;

    Ok((offered, requested))
}
