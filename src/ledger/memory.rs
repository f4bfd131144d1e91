use super::{LedgerIntent, LedgerStore, RecordOutcome};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct LedgerState {
    keys: HashSet<String>,
    intents: Vec<LedgerIntent>,
}

/// In-memory ledger (for development/testing)
///
/// State is lost on restart and not shared between instances. Use
/// `SeaOrmLedgerStore` (feature `database`) in production.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded intent, in insertion order.
    pub async fn intents(&self) -> Vec<LedgerIntent> {
        self.state.read().await.intents.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.intents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn record(&self, intent: LedgerIntent) -> Result<RecordOutcome> {
        let mut state = self.state.write().await;

        // Check and insert under one write lock so concurrent redeliveries race safely
        if !state.keys.insert(intent.idempotency_key.clone()) {
            return Ok(RecordOutcome::Duplicate);
        }
        state.intents.push(intent);

        Ok(RecordOutcome::Recorded)
    }

    async fn intents_for(&self, external_id: &str) -> Result<Vec<LedgerIntent>> {
        let state = self.state.read().await;
        Ok(state
            .intents
            .iter()
            .filter(|intent| intent.external_id == external_id)
            .cloned()
            .collect())
    }
}
