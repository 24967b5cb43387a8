//! Sale lines and the revenue arithmetic over them.

use std::collections::BTreeMap;

use common::{AggregateId, PartyId};
use serde::{Deserialize, Serialize};

use crate::value_objects::Money;

/// A line as the buyer submits it, before the seller is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: AggregateId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(product_id: AggregateId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Pins the line to the product's owner at placement time.
    pub fn with_seller(self, seller: PartyId) -> LineItem {
        LineItem {
            product_id: self.product_id,
            seller,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// A recorded sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: AggregateId,
    pub seller: PartyId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
    /// quantity × unit_price, or None on overflow.
    pub fn checked_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Σ quantity × unit_price, or None on overflow.
pub fn order_total(lines: impl IntoIterator<Item = (u32, Money)>) -> Option<Money> {
    lines
        .into_iter()
        .try_fold(Money::zero(), |acc, (quantity, unit_price)| {
            acc.checked_add(unit_price.checked_multiply(quantity)?)
        })
}

/// Revenue owed to one seller: Σ quantity × unit_price over that seller's lines.
///
/// Sellers with no line get zero.
pub fn seller_subtotal(items: &[LineItem], seller: PartyId) -> Money {
    items
        .iter()
        .filter(|item| item.seller == seller)
        .fold(Money::zero(), |acc, item| {
            acc.saturating_add(item.unit_price.saturating_multiply(item.quantity))
        })
}

/// Revenue per seller, ordered by seller id.
pub fn seller_subtotals(items: &[LineItem]) -> BTreeMap<PartyId, Money> {
    let mut subtotals: BTreeMap<PartyId, Money> = BTreeMap::new();
    for item in items {
        let line = item.unit_price.saturating_multiply(item.quantity);
        let entry = subtotals.entry(item.seller).or_default();
        *entry = entry.saturating_add(line);
    }
    subtotals
}
