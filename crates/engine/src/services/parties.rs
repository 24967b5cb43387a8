//! Party directory trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use common::PartyId;
use tokio::sync::RwLock;

use crate::error::EngineError;

/// Answers whether a party reference points at a registered participant.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn exists(&self, party: PartyId) -> Result<bool, EngineError>;
}

/// In-memory party directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPartyDirectory {
    parties: Arc<RwLock<HashSet<PartyId>>>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a party. Registering twice is harmless.
    pub async fn register(&self, party: PartyId) {
        self.parties.write().await.insert(party);
    }

    /// Registers a fresh party and returns its id.
    pub async fn register_new(&self) -> PartyId {
        let party = PartyId::new();
        self.register(party).await;
        party
    }

    pub async fn len(&self) -> usize {
        self.parties.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.parties.read().await.is_empty()
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn exists(&self, party: PartyId) -> Result<bool, EngineError> {
        Ok(self.parties.read().await.contains(&party))
    }
}
