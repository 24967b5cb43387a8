//! Donation request endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Aggregate, DonationRequest, DonationStatus, RejectionReason};
use engine::{DonationResolution, RequestDonation, ResolveDonation};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::products::ProductResponse;
use super::{StatusChangeRequest, parse_aggregate_id, parse_party_id, parse_variant};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RequestDonationRequest {
    pub product_id: String,
    pub requester: String,
    pub message: Option<String>,
}

#[derive(Serialize)]
pub struct DonationResponse {
    pub id: String,
    pub product_id: String,
    pub donated_by: String,
    pub donated_to: String,
    pub status: DonationStatus,
    pub message: Option<String>,
    pub rejection: Option<RejectionReason>,
    pub requested_at: Option<String>,
    pub resolved_at: Option<String>,
}

impl From<&DonationRequest> for DonationResponse {
    fn from(request: &DonationRequest) -> Self {
        Self {
            id: request.id().map(|id| id.to_string()).unwrap_or_default(),
            product_id: request.product().to_string(),
            donated_by: request.donated_by().to_string(),
            donated_to: request.donated_to().to_string(),
            status: request.status(),
            message: request.message().map(String::from),
            rejection: request.rejection(),
            requested_at: request.requested_at().map(|t| t.to_rfc3339()),
            resolved_at: request.resolved_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct DonationResolutionResponse {
    pub request: DonationResponse,
    pub product: Option<ProductResponse>,
    pub rejected_requests: Vec<String>,
    pub cancelled_proposals: Vec<String>,
}

impl From<&DonationResolution> for DonationResolutionResponse {
    fn from(resolution: &DonationResolution) -> Self {
        Self {
            request: DonationResponse::from(&resolution.request),
            product: resolution.product.as_ref().map(ProductResponse::from),
            rejected_requests: resolution
                .rejected_requests
                .iter()
                .map(|id| id.to_string())
                .collect(),
            cancelled_proposals: resolution
                .cancelled_proposals
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

/// POST /donations: ask for a product offered as a donation.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RequestDonationRequest>,
) -> Result<(StatusCode, Json<DonationResponse>), ApiError> {
    let mut cmd = RequestDonation::new(
        parse_aggregate_id("product_id", &req.product_id)?,
        parse_party_id("requester", &req.requester)?,
    );
    if let Some(message) = req.message {
        cmd = cmd.with_message(message);
    }

    let request = state.engine.request_donation(cmd).await?;
    Ok((StatusCode::CREATED, Json(DonationResponse::from(&request))))
}

/// GET /donations/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DonationResponse>, ApiError> {
    let request_id = parse_aggregate_id("donation id", &id)?;
    let request = state
        .engine
        .get_donation(request_id)
        .await?
        .ok_or_else(|| ApiError::not_found("donation_request", request_id))?;

    Ok(Json(DonationResponse::from(&request)))
}

/// POST /donations/{id}/resolve: the donor accepts or rejects.
#[tracing::instrument(skip(state, req))]
pub async fn resolve<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<DonationResolutionResponse>, ApiError> {
    let cmd = ResolveDonation::new(
        parse_aggregate_id("donation id", &id)?,
        parse_variant(&req.status)?,
        parse_party_id("acting_party", &req.acting_party)?,
    );

    let resolution = state.engine.resolve_donation(cmd).await?;
    Ok(Json(DonationResolutionResponse::from(&resolution)))
}
