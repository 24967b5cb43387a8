//! Seller payouts read model: what each seller has earned from sales.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, PartyId};
use domain::{Aggregate, Money, PaymentStatus, SaleEvent, SaleTransaction, seller_subtotals};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::Projection;
use crate::read_model::ReadModel;

/// Running totals for one seller.
///
/// `earned` counts sales whose payment is completed, net of refunds. `pending`
/// counts sales still waiting for payment. A failed payment drops out of both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellerPayout {
    pub seller: PartyId,
    pub completed_sales: u64,
    pub earned: Money,
    pub pending: Money,
    pub refunded: Money,
}

impl SellerPayout {
    fn new(seller: PartyId) -> Self {
        Self {
            seller,
            completed_sales: 0,
            earned: Money::zero(),
            pending: Money::zero(),
            refunded: Money::zero(),
        }
    }
}

/// What the view remembers about a sale to account for later payment changes.
struct TrackedSale {
    subtotals: BTreeMap<PartyId, Money>,
    payment_status: PaymentStatus,
}

#[derive(Default)]
struct PayoutsState {
    sellers: HashMap<PartyId, SellerPayout>,
    sales: HashMap<AggregateId, TrackedSale>,
}

impl PayoutsState {
    fn seller(&mut self, seller: PartyId) -> &mut SellerPayout {
        self.sellers
            .entry(seller)
            .or_insert_with(|| SellerPayout::new(seller))
    }

    fn sale_placed(
        &mut self,
        sale_id: AggregateId,
        subtotals: BTreeMap<PartyId, Money>,
        status: PaymentStatus,
    ) {
        for (&seller, &amount) in &subtotals {
            let payout = self.seller(seller);
            match status {
                PaymentStatus::Completed => {
                    payout.earned = payout.earned.saturating_add(amount);
                    payout.completed_sales += 1;
                }
                _ => payout.pending = payout.pending.saturating_add(amount),
            }
        }
        self.sales.insert(
            sale_id,
            TrackedSale {
                subtotals,
                payment_status: status,
            },
        );
    }

    fn payment_changed(&mut self, sale_id: AggregateId, from: PaymentStatus, to: PaymentStatus) {
        let Some(sale) = self.sales.get_mut(&sale_id) else {
            tracing::warn!(%sale_id, "payment change for a sale the view never saw placed");
            return;
        };
        if sale.payment_status != from {
            tracing::warn!(
                %sale_id,
                tracked = %sale.payment_status,
                %from,
                "payment change does not start from the tracked status"
            );
        }
        sale.payment_status = to;
        let subtotals = sale.subtotals.clone();

        for (seller, amount) in subtotals {
            let payout = self.seller(seller);
            match (from, to) {
                (PaymentStatus::Pending, PaymentStatus::Completed) => {
                    payout.pending = payout.pending.saturating_sub(amount);
                    payout.earned = payout.earned.saturating_add(amount);
                    payout.completed_sales += 1;
                }
                (PaymentStatus::Pending, PaymentStatus::Failed) => {
                    payout.pending = payout.pending.saturating_sub(amount);
                }
                (PaymentStatus::Completed, PaymentStatus::Refunded) => {
                    payout.earned = payout.earned.saturating_sub(amount);
                    payout.refunded = payout.refunded.saturating_add(amount);
                    payout.completed_sales = payout.completed_sales.saturating_sub(1);
                }
                _ => {}
            }
        }
    }
}

/// Per-seller revenue built from sale transaction events.
#[derive(Clone, Default)]
pub struct SellerPayoutsView {
    state: Arc<RwLock<PayoutsState>>,
}

impl SellerPayoutsView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, seller: PartyId) -> Option<SellerPayout> {
        self.state.read().await.sellers.get(&seller).cloned()
    }

    pub async fn all(&self) -> Vec<SellerPayout> {
        self.state.read().await.sellers.values().cloned().collect()
    }

    /// Sellers with the highest net earnings first.
    pub async fn top_earners(&self, limit: usize) -> Vec<SellerPayout> {
        let mut payouts = self.all().await;
        payouts.sort_by(|a, b| b.earned.cmp(&a.earned));
        payouts.truncate(limit);
        payouts
    }
}

#[async_trait]
impl Projection for SellerPayoutsView {
    fn name(&self) -> &'static str {
        "SellerPayoutsView"
    }

    fn aggregate_types(&self) -> &'static [&'static str] {
        const TYPES: &[&str] = &["SaleTransaction"];
        TYPES
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != SaleTransaction::aggregate_type() {
            return Ok(());
        }
        let sale_event: SaleEvent = serde_json::from_value(event.payload.clone())?;
        let mut state = self.state.write().await;

        match sale_event {
            SaleEvent::SalePlaced(data) => {
                let subtotals = seller_subtotals(&data.line_items);
                state.sale_placed(event.aggregate_id, subtotals, data.payment_status);
            }
            SaleEvent::PaymentStatusChanged(data) => {
                state.payment_changed(event.aggregate_id, data.from, data.to);
            }
            SaleEvent::StockCommitted(_) | SaleEvent::FulfillmentStatusChanged(_) => {}
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = PayoutsState::default();
        Ok(())
    }
}

impl ReadModel for SellerPayoutsView {
    fn name(&self) -> &'static str {
        "SellerPayoutsView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.sellers.len()).unwrap_or(0)
    }
}
