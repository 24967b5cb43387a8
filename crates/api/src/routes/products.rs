//! Listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Aggregate, GeoPoint, Money, Product, ProductStatus};
use engine::{ListProduct, UpdateListing};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{parse_aggregate_id, parse_party_id, parse_variant};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListProductRequest {
    pub owner: String,
    pub title: String,
    pub status: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub location: Option<GeoPoint>,
}

/// Fields left out are not changed.
#[derive(Deserialize)]
pub struct UpdateListingRequest {
    pub acting_party: String,
    pub title: Option<String>,
    pub status: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub quantity: Option<u32>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub status: ProductStatus,
    pub unit_price_cents: i64,
    pub quantity_available: u32,
    pub location: Option<GeoPoint>,
    pub pending_exchanges: Vec<String>,
    pub pending_donations: Vec<String>,
    pub version: i64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id().map(|id| id.to_string()).unwrap_or_default(),
            owner: product.owner().to_string(),
            title: product.title().to_string(),
            status: product.status(),
            unit_price_cents: product.unit_price().cents(),
            quantity_available: product.quantity_available(),
            location: product.location(),
            pending_exchanges: product.pending_exchanges().map(|id| id.to_string()).collect(),
            pending_donations: product.pending_donations().map(|id| id.to_string()).collect(),
            version: product.version().as_i64(),
        }
    }
}

/// POST /products: create a listing.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ListProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let owner = parse_party_id("owner", &req.owner)?;
    let status = parse_variant(&req.status)?;

    let mut cmd = ListProduct::new(
        owner,
        req.title,
        status,
        Money::from_cents(req.unit_price_cents),
        req.quantity,
    );
    if let Some(location) = req.location {
        cmd = cmd.with_location(location);
    }

    let product = state.engine.list_product(cmd).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse::from(&product))))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_aggregate_id("product id", &id)?;
    let product = state
        .engine
        .get_product(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("product", product_id))?;

    Ok(Json(ProductResponse::from(&product)))
}

/// PATCH /products/{id}: the owner edits a listing.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateListingRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product_id = parse_aggregate_id("product id", &id)?;
    let acting_party = parse_party_id("acting_party", &req.acting_party)?;

    let mut cmd = UpdateListing::new(product_id, acting_party);
    if let Some(title) = req.title {
        cmd = cmd.title(title);
    }
    if let Some(status) = req.status {
        cmd = cmd.status(parse_variant(&status)?);
    }
    if let Some(cents) = req.unit_price_cents {
        cmd = cmd.unit_price(Money::from_cents(cents));
    }
    if let Some(quantity) = req.quantity {
        cmd = cmd.quantity(quantity);
    }

    let product = state.engine.update_listing(cmd).await?;
    Ok(Json(ProductResponse::from(&product)))
}
