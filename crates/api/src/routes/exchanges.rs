//! Exchange proposal endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Aggregate, CancellationReason, ExchangeProposal, ExchangeStatus};
use engine::{ExchangeResolution, ProposeExchange, ResolveExchange};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::products::ProductResponse;
use super::{StatusChangeRequest, parse_aggregate_id, parse_party_id, parse_variant};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ProposeExchangeRequest {
    pub product_offered: String,
    pub product_requested: String,
    pub proposer: String,
}

#[derive(Serialize)]
pub struct ExchangeResponse {
    pub id: String,
    pub product_offered: String,
    pub product_requested: String,
    pub proposer: String,
    pub recipient: String,
    pub status: ExchangeStatus,
    pub cancellation: Option<CancellationReason>,
    pub created_at: Option<String>,
    pub resolved_at: Option<String>,
}

impl From<&ExchangeProposal> for ExchangeResponse {
    fn from(proposal: &ExchangeProposal) -> Self {
        Self {
            id: proposal.id().map(|id| id.to_string()).unwrap_or_default(),
            product_offered: proposal.product_offered().to_string(),
            product_requested: proposal.product_requested().to_string(),
            proposer: proposal.proposer().to_string(),
            recipient: proposal.recipient().to_string(),
            status: proposal.status(),
            cancellation: proposal.cancellation(),
            created_at: proposal.created_at().map(|t| t.to_rfc3339()),
            resolved_at: proposal.resolved_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct ExchangeResolutionResponse {
    pub proposal: ExchangeResponse,
    pub cancelled_proposals: Vec<String>,
    pub rejected_donations: Vec<String>,
    /// Offered then requested product, after the swap. Empty unless accepted.
    pub products: Vec<ProductResponse>,
}

impl From<&ExchangeResolution> for ExchangeResolutionResponse {
    fn from(resolution: &ExchangeResolution) -> Self {
        Self {
            proposal: ExchangeResponse::from(&resolution.proposal),
            cancelled_proposals: resolution
                .cancelled_proposals
                .iter()
                .map(|id| id.to_string())
                .collect(),
            rejected_donations: resolution
                .rejected_donations
                .iter()
                .map(|id| id.to_string())
                .collect(),
            products: resolution
                .products
                .iter()
                .flat_map(|(offered, requested)| {
                    [ProductResponse::from(offered), ProductResponse::from(requested)]
                })
                .collect(),
        }
    }
}

/// POST /exchanges: propose swapping one's product for another's.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ProposeExchangeRequest>,
) -> Result<(StatusCode, Json<ExchangeResponse>), ApiError> {
    let cmd = ProposeExchange::new(
        parse_aggregate_id("product_offered", &req.product_offered)?,
        parse_aggregate_id("product_requested", &req.product_requested)?,
        parse_party_id("proposer", &req.proposer)?,
    );

    let proposal = state.engine.propose_exchange(cmd).await?;
    Ok((StatusCode::CREATED, Json(ExchangeResponse::from(&proposal))))
}

/// GET /exchanges/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let proposal_id = parse_aggregate_id("exchange id", &id)?;
    let proposal = state
        .engine
        .get_exchange(proposal_id)
        .await?
        .ok_or_else(|| ApiError::not_found("exchange_proposal", proposal_id))?;

    Ok(Json(ExchangeResponse::from(&proposal)))
}

/// POST /exchanges/{id}/resolve: accept, reject or cancel a proposal.
#[tracing::instrument(skip(state, req))]
pub async fn resolve<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<ExchangeResolutionResponse>, ApiError> {
    let cmd = ResolveExchange::new(
        parse_aggregate_id("exchange id", &id)?,
        parse_variant(&req.status)?,
        parse_party_id("acting_party", &req.acting_party)?,
    );

    let resolution = state.engine.resolve_exchange(cmd).await?;
    Ok(Json(ExchangeResolutionResponse::from(&resolution)))
}
