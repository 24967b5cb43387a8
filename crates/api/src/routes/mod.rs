//! HTTP handlers, one module per resource.

pub mod donations;
pub mod exchanges;
pub mod health;
pub mod metrics;
pub mod parties;
pub mod payouts;
pub mod products;
pub mod sales;

use std::fmt::Display;
use std::str::FromStr;

use common::{AggregateId, PartyId};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Body of every status change: the target status and who asks for it.
#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub status: String,
    pub acting_party: String,
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|e| ApiError::bad_request(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_aggregate_id(field: &str, value: &str) -> Result<AggregateId, ApiError> {
    parse_uuid(field, value).map(AggregateId::from)
}

pub(crate) fn parse_party_id(field: &str, value: &str) -> Result<PartyId, ApiError> {
    parse_uuid(field, value).map(PartyId::from)
}

/// Parses a snake_case enum value such as `for_sale` or `completed`.
pub(crate) fn parse_variant<T>(value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ApiError::bad_request(e.to_string()))
}
