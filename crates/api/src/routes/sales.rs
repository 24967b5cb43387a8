//! Sale endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{
    Aggregate, FulfillmentStatus, Money, OrderLine, PaymentMethod, PaymentStatus, SaleTransaction,
};
use engine::{PlaceSale, SalePlacement, SetFulfillmentStatus, SetPaymentStatus};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{StatusChangeRequest, parse_aggregate_id, parse_party_id, parse_variant};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Deserialize)]
pub struct PlaceSaleRequest {
    pub buyer: String,
    pub lines: Vec<OrderLineRequest>,
    pub total_cents: i64,
    pub payment_method: String,
    pub payment_status: String,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub seller: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub buyer: String,
    pub line_items: Vec<LineItemResponse>,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub stock_committed: bool,
    pub placed_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<&SaleTransaction> for SaleResponse {
    fn from(sale: &SaleTransaction) -> Self {
        Self {
            id: sale.id().map(|id| id.to_string()).unwrap_or_default(),
            buyer: sale.buyer().to_string(),
            line_items: sale
                .line_items()
                .iter()
                .map(|item| LineItemResponse {
                    product_id: item.product_id.to_string(),
                    seller: item.seller.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: sale.total_amount().cents(),
            payment_method: sale.payment_method(),
            payment_status: sale.payment_status(),
            fulfillment_status: sale.fulfillment_status(),
            stock_committed: sale.stock_committed(),
            placed_at: sale.placed_at().map(|t| t.to_rfc3339()),
            updated_at: sale.updated_at().map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Serialize)]
pub struct SellerSubtotalResponse {
    pub seller: String,
    pub subtotal_cents: i64,
}

#[derive(Serialize)]
pub struct SalePlacementResponse {
    pub sale: SaleResponse,
    pub seller_subtotals: Vec<SellerSubtotalResponse>,
}

impl From<&SalePlacement> for SalePlacementResponse {
    fn from(placement: &SalePlacement) -> Self {
        Self {
            sale: SaleResponse::from(&placement.transaction),
            seller_subtotals: placement
                .seller_subtotals
                .iter()
                .map(|(seller, subtotal)| SellerSubtotalResponse {
                    seller: seller.to_string(),
                    subtotal_cents: subtotal.cents(),
                })
                .collect(),
        }
    }
}

/// POST /sales: place an order across one or more sellers.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceSaleRequest>,
) -> Result<(StatusCode, Json<SalePlacementResponse>), ApiError> {
    let buyer = parse_party_id("buyer", &req.buyer)?;
    let lines = req
        .lines
        .iter()
        .map(|line| {
            Ok(OrderLine::new(
                parse_aggregate_id("product_id", &line.product_id)?,
                line.quantity,
                Money::from_cents(line.unit_price_cents),
            ))
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let cmd = PlaceSale::new(
        buyer,
        lines,
        Money::from_cents(req.total_cents),
        parse_variant(&req.payment_method)?,
        parse_variant(&req.payment_status)?,
    );

    let placement = state.engine.place_sale(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(SalePlacementResponse::from(&placement)),
    ))
}

/// GET /sales/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, ApiError> {
    let sale_id = parse_aggregate_id("sale id", &id)?;
    let sale = state
        .engine
        .get_sale(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("sale_transaction", sale_id))?;

    Ok(Json(SaleResponse::from(&sale)))
}

/// POST /sales/{id}/payment: a seller on the sale moves its payment status.
#[tracing::instrument(skip(state, req))]
pub async fn set_payment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<SaleResponse>, ApiError> {
    let cmd = SetPaymentStatus::new(
        parse_aggregate_id("sale id", &id)?,
        parse_variant(&req.status)?,
        parse_party_id("acting_party", &req.acting_party)?,
    );

    let sale = state.engine.set_payment_status(cmd).await?;
    Ok(Json(SaleResponse::from(&sale)))
}

/// POST /sales/{id}/fulfillment
#[tracing::instrument(skip(state, req))]
pub async fn set_fulfillment<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<SaleResponse>, ApiError> {
    let cmd = SetFulfillmentStatus::new(
        parse_aggregate_id("sale id", &id)?,
        parse_variant(&req.status)?,
        parse_party_id("acting_party", &req.acting_party)?,
    );

    let sale = state.engine.set_fulfillment_status(cmd).await?;
    Ok(Json(SaleResponse::from(&sale)))
}
