//! Seller payouts read from the projection.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use event_store::EventStore;
use projections::SellerPayout;
use serde::Serialize;

use super::parse_party_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PayoutResponse {
    pub seller: String,
    pub completed_sales: u64,
    pub earned_cents: i64,
    pub pending_cents: i64,
    pub refunded_cents: i64,
}

impl From<&SellerPayout> for PayoutResponse {
    fn from(payout: &SellerPayout) -> Self {
        Self {
            seller: payout.seller.to_string(),
            completed_sales: payout.completed_sales,
            earned_cents: payout.earned.cents(),
            pending_cents: payout.pending.cents(),
            refunded_cents: payout.refunded.cents(),
        }
    }
}

/// GET /sellers/{id}/payouts: a seller with no sales reads as all zeros.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let seller = parse_party_id("seller id", &id)?;

    // Bring the view up to date with the log before reading it.
    state.projection_processor.run_catch_up().await?;

    let response = match state.payouts.get(seller).await {
        Some(payout) => PayoutResponse::from(&payout),
        None => PayoutResponse {
            seller: seller.to_string(),
            completed_sales: 0,
            earned_cents: 0,
            pending_cents: 0,
            refunded_cents: 0,
        },
    };
    Ok(Json(response))
}
