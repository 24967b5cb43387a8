//! Shared application state.

use std::sync::Arc;

use engine::{
    ConsistencyEngine, EngineConfig, InMemoryPartyDirectory, TracingNotificationEmitter,
};
use event_store::EventStore;
use projections::{Projection, ProjectionProcessor, SellerPayoutsView};

/// The engine as the server runs it.
pub type MarketEngine<S> =
    ConsistencyEngine<S, InMemoryPartyDirectory, TracingNotificationEmitter>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub engine: MarketEngine<S>,
    pub payouts: SellerPayoutsView,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    /// Wires the engine and the payouts projection to one store.
    pub fn new(event_store: S, config: &EngineConfig) -> Self {
        let engine = ConsistencyEngine::with_config(
            event_store.clone(),
            InMemoryPartyDirectory::new(),
            TracingNotificationEmitter,
            config,
        );

        let payouts = SellerPayoutsView::new();
        let mut processor = ProjectionProcessor::new(event_store);
        processor.register(Box::new(payouts.clone()) as Box<dyn Projection>);

        Self {
            engine,
            payouts,
            projection_processor: Arc::new(processor),
        }
    }
}
