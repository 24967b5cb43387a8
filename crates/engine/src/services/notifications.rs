//! Notification emitter trait and implementations.
//!
//! Notifications are sent after a unit of work committed. Delivery is best
//! effort: a failed emit is logged and counted, the committed result stands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::PartyId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::EngineError;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExchangeProposed,
    ExchangeResolved,
    ExchangeCancelled,
    DonationRequested,
    DonationResolved,
    DonationRejected,
    SalePlaced,
    PaymentStatusChanged,
    FulfillmentStatusChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ExchangeProposed => "exchange_proposed",
            NotificationKind::ExchangeResolved => "exchange_resolved",
            NotificationKind::ExchangeCancelled => "exchange_cancelled",
            NotificationKind::DonationRequested => "donation_requested",
            NotificationKind::DonationResolved => "donation_resolved",
            NotificationKind::DonationRejected => "donation_rejected",
            NotificationKind::SalePlaced => "sale_placed",
            NotificationKind::PaymentStatusChanged => "payment_status_changed",
            NotificationKind::FulfillmentStatusChanged => "fulfillment_status_changed",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: PartyId,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(recipient: PartyId, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self {
            recipient,
            kind,
            payload,
        }
    }
}

/// Delivers notifications to parties.
#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, notification: Notification) -> Result<(), EngineError>;
}

/// Records every notification; used by tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationEmitter {
    sent: Arc<RwLock<Vec<Notification>>>,
    fail_on_emit: Arc<AtomicBool>,
}

impl InMemoryNotificationEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every emit fail until switched back.
    pub fn set_fail_on_emit(&self, fail: bool) {
        self.fail_on_emit.store(fail, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }

    /// Notifications addressed to `party`, oldest first.
    pub async fn sent_to(&self, party: PartyId) -> Vec<Notification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.recipient == party)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.sent.write().await.clear();
    }
}

#[async_trait]
impl NotificationEmitter for InMemoryNotificationEmitter {
    async fn emit(&self, notification: Notification) -> Result<(), EngineError> {
        if self.fail_on_emit.load(Ordering::SeqCst) {
            return Err(EngineError::Unavailable {
                reason: "notification channel down".to_string(),
            });
        }
        self.sent.write().await.push(notification);
        Ok(())
    }
}

/// Writes notifications to the log. Used by the API binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationEmitter;

#[async_trait]
impl NotificationEmitter for TracingNotificationEmitter {
    async fn emit(&self, notification: Notification) -> Result<(), EngineError> {
        tracing::info!(
            recipient = %notification.recipient,
            kind = %notification.kind,
            payload = %notification.payload,
            "notification"
        );
        Ok(())
    }
}
