//! The consistency engine and its shared plumbing.

use std::time::Instant;

use common::{AggregateId, PartyId};
use domain::{DonationRequest, ExchangeProposal, Product, SaleTransaction, load_aggregate};
use event_store::EventStore;

use crate::config::EngineConfig;
use crate::error::{EngineError, PARTY};
use crate::retry::RetryPolicy;
use crate::services::notifications::{Notification, NotificationEmitter};
use crate::services::parties::PartyDirectory;

/// Runs every state-changing marketplace operation.
///
/// Operations live in their own modules (`listing`, `exchange`, `donation`,
/// `sale`) as further `impl` blocks on this type.
pub struct ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    pub(crate) store: S,
    pub(crate) parties: P,
    pub(crate) notifier: N,
    pub(crate) retry: RetryPolicy,
}

impl<S, P, N> ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    /// Creates an engine with the default retry policy.
    pub fn new(store: S, parties: P, notifier: N) -> Self {
        Self::with_config(store, parties, notifier, &EngineConfig::default())
    }

    pub fn with_config(store: S, parties: P, notifier: N, config: &EngineConfig) -> Self {
        Self {
            store,
            parties,
            notifier,
            retry: RetryPolicy::from(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn parties(&self) -> &P {
        &self.parties
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: AggregateId) -> Result<Option<Product>, EngineError> {
        Ok(load_aggregate(&self.store, id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_exchange(
        &self,
        id: AggregateId,
    ) -> Result<Option<ExchangeProposal>, EngineError> {
        Ok(load_aggregate(&self.store, id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_donation(
        &self,
        id: AggregateId,
    ) -> Result<Option<DonationRequest>, EngineError> {
        Ok(load_aggregate(&self.store, id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_sale(&self, id: AggregateId) -> Result<Option<SaleTransaction>, EngineError> {
        Ok(load_aggregate(&self.store, id).await?)
    }

    pub(crate) async fn ensure_party_exists(&self, party: PartyId) -> Result<(), EngineError> {
        if self.parties.exists(party).await? {
            Ok(())
        } else {
            Err(EngineError::not_found(PARTY, party))
        }
    }

    /// Sends notifications for a committed operation. Failures are logged only.
    pub(crate) async fn notify(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let recipient = notification.recipient;
            let kind = notification.kind;
            if let Err(e) = self.notifier.emit(notification).await {
                metrics::counter!("engine_notifications_failed_total").increment(1);
                tracing::warn!(%recipient, %kind, error = %e, "notification not delivered");
            }
        }
    }
}

/// Records the operation counter and duration histogram.
pub(crate) fn observe<T>(
    operation: &'static str,
    started: Instant,
    result: &Result<T, EngineError>,
) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!("engine_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("engine_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());

    if let Err(e) = result {
        tracing::info!(operation, outcome, error = %e, "operation failed");
    }
}
