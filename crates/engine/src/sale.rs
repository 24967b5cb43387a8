//! Sale placement and payment/fulfillment transitions.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use common::AggregateId;
use domain::{PaymentStatus, Product, SaleTransaction, UnitOfWork};
use event_store::EventStore;

use crate::cascade::Cascade;
use crate::commands::{PlaceSale, SalePlacement, SetFulfillmentStatus, SetPaymentStatus};
use crate::engine::{ConsistencyEngine, observe};
use crate::error::{EngineError, PRODUCT, SALE_TRANSACTION};
use crate::retry::AttemptError;
use crate::services::{Notification, NotificationEmitter, NotificationKind, PartyDirectory};

impl<S, P, N> ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    /// Places a buyer's order.
    ///
    /// The order is validated before anything is read. Every line must carry
    /// the product's listed price. With a completed payment the stock of every
    /// product is taken in the same commit as the sale itself; if any product
    /// is short, nothing is written. A product that sells out closes its open
    /// offers in that commit.
    #[tracing::instrument(
        skip(self, cmd),
        fields(sale_id = %cmd.sale_id, buyer = %cmd.buyer, lines = cmd.lines.len())
    )]
    pub async fn place_sale(&self, cmd: PlaceSale) -> Result<SalePlacement, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = match SaleTransaction::validate_order(
            &cmd.lines,
            cmd.declared_total,
            cmd.payment_status,
        ) {
            Ok(_) => {
                self.retry
                    .run("place_sale", SALE_TRANSACTION, cmd.sale_id.into(), || {
                        self.try_place_sale(cmd)
                    })
                    .await
            }
            Err(e) => Err(EngineError::sale(cmd.sale_id, e)),
        };
        observe("place_sale", started, &result);

        let (placement, cascade) = result?;
        tracing::info!(
            total_cents = placement.transaction.total_amount().cents(),
            stock_committed = placement.transaction.stock_committed(),
            cancelled_proposals = cascade.cancelled_proposals.len(),
            rejected_donations = cascade.rejected_donations.len(),
            "sale placed"
        );

        let mut notifications: Vec<Notification> = placement
            .seller_subtotals
            .iter()
            .map(|(seller, subtotal)| {
                Notification::new(
                    *seller,
                    NotificationKind::SalePlaced,
                    serde_json::json!({
                        "sale_id": cmd.sale_id,
                        "buyer": cmd.buyer,
                        "subtotal_cents": subtotal.cents(),
                        "payment_status": placement.transaction.payment_status(),
                    }),
                )
            })
            .collect();
        notifications.extend(cascade.notifications);
        self.notify(notifications).await;

        Ok(placement)
    }

    async fn try_place_sale(
        &self,
        cmd: &PlaceSale,
    ) -> Result<(SalePlacement, Cascade), AttemptError> {
        self.ensure_party_exists(cmd.buyer).await?;

        let mut uow = UnitOfWork::begin(&self.store, "place_sale");
        let mut products: BTreeMap<AggregateId, Product> = BTreeMap::new();
        let mut line_items = Vec::with_capacity(cmd.lines.len());

        for line in &cmd.lines {
            let product = match products.entry(line.product_id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let product: Product = uow
                        .load(line.product_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(PRODUCT, line.product_id))?;
                    entry.insert(product)
                }
            };

            // A sold-out product is left to the stock check, which reports the shortfall.
            let sold_out = product.is_sold_out() && cmd.payment_status == PaymentStatus::Completed;
            if !product.status().can_sell() && !sold_out {
                return Err(EngineError::conflict(
                    PRODUCT,
                    line.product_id,
                    format!("product is {}", product.status()),
                )
                .into());
            }
            if product.is_owned_by(cmd.buyer) {
                return Err(EngineError::validation(format!(
                    "buyer cannot purchase their own listing {}",
                    line.product_id
                ))
                .into());
            }
            if line.unit_price != product.unit_price() {
                return Err(EngineError::conflict(
                    PRODUCT,
                    line.product_id,
                    format!(
                        "line price {} does not match listed price {}",
                        line.unit_price,
                        product.unit_price()
                    ),
                )
                .into());
            }

            line_items.push(line.with_seller(product.owner()));
        }

        let mut sale = SaleTransaction::default();
        let events = sale
            .place(
                cmd.sale_id,
                cmd.buyer,
                line_items,
                cmd.declared_total,
                cmd.payment_method,
                cmd.payment_status,
            )
            .map_err(|e| EngineError::sale(cmd.sale_id, e))?;
        uow.record(&mut sale, events)?;

        let mut cascade = Cascade::holding(products.keys().copied());
        if sale.payment_status() == PaymentStatus::Completed {
            take_stock(&mut uow, cmd.sale_id, &mut sale, &mut products, &mut cascade).await?;
        }

        uow.commit().await?;

        let seller_subtotals = sale.seller_subtotals();
        Ok((
            SalePlacement {
                transaction: sale,
                seller_subtotals,
            },
            cascade,
        ))
    }

    /// Moves the payment status of a sale. Only a seller on the sale may.
    ///
    /// Completing a payment whose stock was not taken yet takes it in the same
    /// commit. Completing an already completed payment changes nothing.
    #[tracing::instrument(
        skip(self, cmd),
        fields(sale_id = %cmd.sale_id, status = %cmd.status, acting_party = %cmd.acting_party)
    )]
    pub async fn set_payment_status(
        &self,
        cmd: SetPaymentStatus,
    ) -> Result<SaleTransaction, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "set_payment_status",
                SALE_TRANSACTION,
                cmd.sale_id.into(),
                || self.try_set_payment_status(cmd),
            )
            .await;
        observe("set_payment_status", started, &result);

        let (sale, cascade) = result?;
        if let Some(cascade) = cascade {
            tracing::info!(
                stock_committed = sale.stock_committed(),
                cancelled_proposals = cascade.cancelled_proposals.len(),
                "payment status changed"
            );
            let mut notifications = vec![Notification::new(
                sale.buyer(),
                NotificationKind::PaymentStatusChanged,
                serde_json::json!({
                    "sale_id": cmd.sale_id,
                    "payment_status": sale.payment_status(),
                }),
            )];
            notifications.extend(cascade.notifications);
            self.notify(notifications).await;
        }
        Ok(sale)
    }

    /// Returns the cascade of the change, or `None` when nothing changed.
    async fn try_set_payment_status(
        &self,
        cmd: &SetPaymentStatus,
    ) -> Result<(SaleTransaction, Option<Cascade>), AttemptError> {
        let mut uow = UnitOfWork::begin(&self.store, "set_payment_status");
        let mut sale: SaleTransaction = uow
            .load(cmd.sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found(SALE_TRANSACTION, cmd.sale_id))?;

        let events = sale
            .set_payment_status(cmd.acting_party, cmd.status)
            .map_err(|e| EngineError::sale(cmd.sale_id, e))?;
        if events.is_empty() {
            return Ok((sale, None));
        }
        uow.record(&mut sale, events)?;

        let mut cascade = Cascade::default();
        if sale.payment_status() == PaymentStatus::Completed && !sale.stock_committed() {
            let mut products = BTreeMap::new();
            for product_id in sale.quantities_by_product().into_keys() {
                let product: Product = uow
                    .load(product_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found(PRODUCT, product_id))?;
                products.insert(product_id, product);
            }
            cascade = Cascade::holding(products.keys().copied());
            take_stock(&mut uow, cmd.sale_id, &mut sale, &mut products, &mut cascade).await?;
        }

        uow.commit().await?;
        Ok((sale, Some(cascade)))
    }

    /// Moves the fulfillment status of a sale. Only a seller on the sale may.
    #[tracing::instrument(
        skip(self, cmd),
        fields(sale_id = %cmd.sale_id, status = %cmd.status, acting_party = %cmd.acting_party)
    )]
    pub async fn set_fulfillment_status(
        &self,
        cmd: SetFulfillmentStatus,
    ) -> Result<SaleTransaction, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run(
                "set_fulfillment_status",
                SALE_TRANSACTION,
                cmd.sale_id.into(),
                || self.try_set_fulfillment_status(cmd),
            )
            .await;
        observe("set_fulfillment_status", started, &result);

        let (sale, changed) = result?;
        if changed {
            self.notify(vec![Notification::new(
                sale.buyer(),
                NotificationKind::FulfillmentStatusChanged,
                serde_json::json!({
                    "sale_id": cmd.sale_id,
                    "fulfillment_status": sale.fulfillment_status(),
                }),
            )])
            .await;
        }
        Ok(sale)
    }

    async fn try_set_fulfillment_status(
        &self,
        cmd: &SetFulfillmentStatus,
    ) -> Result<(SaleTransaction, bool), AttemptError> {
        let mut uow = UnitOfWork::begin(&self.store, "set_fulfillment_status");
        let mut sale: SaleTransaction = uow
            .load(cmd.sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found(SALE_TRANSACTION, cmd.sale_id))?;

        let events = sale
            .set_fulfillment_status(cmd.acting_party, cmd.status)
            .map_err(|e| EngineError::sale(cmd.sale_id, e))?;
        if events.is_empty() {
            return Ok((sale, false));
        }
        uow.record(&mut sale, events)?;
        uow.commit().await?;
        Ok((sale, true))
    }
}

/// Takes the stock for every line of `sale`, summed per product, and marks the
/// sale's stock as committed.
///
/// Any product short of stock fails the whole unit with `InsufficientStock`.
/// A product sold down to zero cancels its open proposals and rejects its
/// open donation requests through `cascade`.
async fn take_stock<S: EventStore + ?Sized>(
    uow: &mut UnitOfWork<'_, S>,
    sale_id: AggregateId,
    sale: &mut SaleTransaction,
    products: &mut BTreeMap<AggregateId, Product>,
    cascade: &mut Cascade,
) -> Result<(), AttemptError> {
    for (product_id, quantity) in sale.quantities_by_product() {
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| EngineError::not_found(PRODUCT, product_id))?;
        let events = product
            .sell(sale_id, quantity)
            .map_err(|e| EngineError::product(product_id, e))?;

        if product.quantity_available() == quantity {
            let proposals: BTreeSet<AggregateId> = product.pending_exchanges().collect();
            cascade
                .cancel_proposals(uow, proposals, |proposal| {
                    proposal.cancel_for_sell_out(product_id)
                })
                .await?;
            let requests: BTreeSet<AggregateId> = product.pending_donations().collect();
            cascade
                .reject_donations(uow, requests, |request| {
                    request.reject_for_sell_out(product_id)
                })
                .await?;
        }

        uow.record(product, events)?;
    }

    let events = sale
        .commit_stock()
        .map_err(|e| EngineError::sale(sale_id, e))?;
    uow.record(sale, events)?;
    Ok(())
}
