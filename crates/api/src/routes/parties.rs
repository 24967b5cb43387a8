//! Party registration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use event_store::EventStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct PartyCreatedResponse {
    pub party_id: String,
}

/// POST /parties: register a new participant.
#[tracing::instrument(skip(state))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<PartyCreatedResponse>) {
    let party = state.engine.parties().register_new().await;
    tracing::info!(%party, "party registered");

    (
        StatusCode::CREATED,
        Json(PartyCreatedResponse {
            party_id: party.to_string(),
        }),
    )
}
