//! Closing the offers left behind when a product changes hands or sells out.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use common::AggregateId;
use domain::{
    DonationError, DonationEvent, DonationRequest, ExchangeError, ExchangeEvent, ExchangeProposal,
    Product, ProductError, ProductEvent, UnitOfWork,
};
use event_store::EventStore;

use crate::error::EngineError;
use crate::retry::AttemptError;
use crate::services::{Notification, NotificationKind};

/// Offers closed as a side effect of a resolution or a sale.
///
/// A closed offer is detached from every product it references, except the
/// products the caller holds: those are being transferred or sold out in the
/// same unit and drop all their offers at once.
#[derive(Debug, Default)]
pub(crate) struct Cascade {
    pub cancelled_proposals: Vec<AggregateId>,
    pub rejected_donations: Vec<AggregateId>,
    pub notifications: Vec<Notification>,
    held: BTreeSet<AggregateId>,
    detached: BTreeMap<AggregateId, Product>,
}

impl Cascade {
    pub fn holding(products: impl IntoIterator<Item = AggregateId>) -> Self {
        Self {
            held: products.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Cancels every proposal in `ids` that is still pending.
    ///
    /// Ids already resolved by the time the unit reads them are skipped.
    pub async fn cancel_proposals<S, F>(
        &mut self,
        uow: &mut UnitOfWork<'_, S>,
        ids: BTreeSet<AggregateId>,
        cancel: F,
    ) -> Result<(), AttemptError>
    where
        S: EventStore + ?Sized,
        F: Fn(&ExchangeProposal) -> Result<Vec<ExchangeEvent>, ExchangeError>,
    {
        for id in ids {
            let Some(mut proposal) = uow.load::<ExchangeProposal>(id).await? else {
                continue;
            };
            if !proposal.status().is_pending() {
                continue;
            }

            let events = cancel(&proposal).map_err(|e| EngineError::exchange(id, e))?;
            uow.record(&mut proposal, events)?;

            for product_id in [proposal.product_offered(), proposal.product_requested()] {
                self.detach(uow, product_id, |product| product.detach_exchange(id))
                    .await?;
            }

            for party in [proposal.proposer(), proposal.recipient()] {
                self.notifications.push(Notification::new(
                    party,
                    NotificationKind::ExchangeCancelled,
                    serde_json::json!({
                        "proposal_id": id,
                        "reason": proposal.cancellation(),
                    }),
                ));
            }
            self.cancelled_proposals.push(id);
        }
        Ok(())
    }

    /// Rejects every donation request in `ids` that is still pending.
    pub async fn reject_donations<S, F>(
        &mut self,
        uow: &mut UnitOfWork<'_, S>,
        ids: BTreeSet<AggregateId>,
        reject: F,
    ) -> Result<(), AttemptError>
    where
        S: EventStore + ?Sized,
        F: Fn(&DonationRequest) -> Result<Vec<DonationEvent>, DonationError>,
    {
        for id in ids {
            let Some(mut request) = uow.load::<DonationRequest>(id).await? else {
                continue;
            };
            if !request.status().is_pending() {
                continue;
            }

            let events = reject(&request).map_err(|e| EngineError::donation(id, e))?;
            uow.record(&mut request, events)?;

            self.detach(uow, request.product(), |product| product.detach_donation(id))
                .await?;

            self.notifications.push(Notification::new(
                request.donated_by(),
                NotificationKind::DonationRejected,
                serde_json::json!({
                    "request_id": id,
                    "product_id": request.product(),
                    "reason": request.rejection(),
                }),
            ));
            self.rejected_donations.push(id);
        }
        Ok(())
    }

    /// Stages a detach on a product the caller does not hold. Each such
    /// product is loaded once per unit.
    async fn detach<S, F>(
        &mut self,
        uow: &mut UnitOfWork<'_, S>,
        product_id: AggregateId,
        detach: F,
    ) -> Result<(), AttemptError>
    where
        S: EventStore + ?Sized,
        F: FnOnce(&Product) -> Result<Vec<ProductEvent>, ProductError>,
    {
        if self.held.contains(&product_id) {
            return Ok(());
        }

        let product = match self.detached.entry(product_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let Some(product) = uow.load::<Product>(product_id).await? else {
                    return Ok(());
                };
                entry.insert(product)
            }
        };

        let events = detach(product).map_err(|e| EngineError::product(product_id, e))?;
        uow.record(product, events)?;
        Ok(())
    }
}
