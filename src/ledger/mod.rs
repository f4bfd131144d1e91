//! Ledger storage for financial intents derived from provider webhooks.
//!
//! Every intent carries an idempotency key. Stores must record a given key at
//! most once, so a provider redelivering the same event never double-applies
//! a deposit or refund.

mod memory;
#[cfg(feature = "database")]
mod sea_orm_store;

pub use memory::InMemoryLedger;
#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmLedgerStore;

use crate::error::Result;
use crate::money::Money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a recorded intent means for the account holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// A completed payment that credits the wallet.
    Deposit,
    /// A failed or canceled payment whose provisional credit must be undone.
    Reversal,
    /// A refund was issued.
    Refund,
    /// A previously issued refund settled.
    RefundCompleted,
    /// A chargeback that needs manual review.
    Dispute,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Reversal => "reversal",
            Self::Refund => "refund",
            Self::RefundCompleted => "refund_completed",
            Self::Dispute => "dispute",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentKind {
    type Err = crate::error::MoneyBuddyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "reversal" => Ok(Self::Reversal),
            "refund" => Ok(Self::Refund),
            "refund_completed" => Ok(Self::RefundCompleted),
            "dispute" => Ok(Self::Dispute),
            other => Err(crate::error::MoneyBuddyError::internal(format!(
                "Unknown intent kind: {}",
                other
            ))),
        }
    }
}

/// A financial intent to be applied by downstream bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerIntent {
    pub kind: IntentKind,
    /// Provider-side identifier of the payment, refund, or dispute.
    pub external_id: String,
    /// Related payment for refunds and disputes.
    pub payment_id: Option<String>,
    pub amount: Option<Money>,
    /// Deduplication key; unique per delivered event.
    pub idempotency_key: String,
    /// Provider event type that produced this intent.
    pub event_type: String,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerIntent {
    pub fn new(
        kind: IntentKind,
        external_id: impl Into<String>,
        idempotency_key: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            external_id: external_id.into(),
            payment_id: None,
            amount: None,
            idempotency_key: idempotency_key.into(),
            event_type: event_type.into(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }
}

/// Result of attempting to record an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The intent was stored.
    Recorded,
    /// An intent with the same idempotency key already exists; nothing changed.
    Duplicate,
}

/// Storage collaborator for ledger intents.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Record an intent, at most once per idempotency key.
    async fn record(&self, intent: LedgerIntent) -> Result<RecordOutcome>;

    /// All intents recorded for a provider-side identifier, oldest first.
    async fn intents_for(&self, external_id: &str) -> Result<Vec<LedgerIntent>>;

    /// Check connectivity to the backing store.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
