//! HTTP API server for the marketplace consistency engine.
//!
//! Exposes listings, exchanges, donations, sales and seller payouts as JSON
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use engine::EngineConfig;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, MarketEngine};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/parties", post(routes::parties::create::<S>))
        .route("/products", post(routes::products::create::<S>))
        .route(
            "/products/{id}",
            get(routes::products::get::<S>).patch(routes::products::update::<S>),
        )
        .route("/exchanges", post(routes::exchanges::create::<S>))
        .route("/exchanges/{id}", get(routes::exchanges::get::<S>))
        .route(
            "/exchanges/{id}/resolve",
            post(routes::exchanges::resolve::<S>),
        )
        .route("/donations", post(routes::donations::create::<S>))
        .route("/donations/{id}", get(routes::donations::get::<S>))
        .route(
            "/donations/{id}/resolve",
            post(routes::donations::resolve::<S>),
        )
        .route("/sales", post(routes::sales::create::<S>))
        .route("/sales/{id}", get(routes::sales::get::<S>))
        .route("/sales/{id}/payment", post(routes::sales::set_payment::<S>))
        .route(
            "/sales/{id}/fulfillment",
            post(routes::sales::set_fulfillment::<S>),
        )
        .route("/sellers/{id}/payouts", get(routes::payouts::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `event_store` with default engine settings.
pub fn create_default_state<S: EventStore + Clone + 'static>(event_store: S) -> Arc<AppState<S>> {
    create_state(event_store, &EngineConfig::default())
}

pub fn create_state<S: EventStore + Clone + 'static>(
    event_store: S,
    config: &EngineConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(event_store, config))
}
