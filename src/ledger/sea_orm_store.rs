//! SeaORM-backed ledger storage.
//!
//! Persists intents to a `ledger_intents` table keyed by idempotency key.
//! The table is expected to exist:
//!
//! ```sql
//! CREATE TABLE ledger_intents (
//!     idempotency_key TEXT PRIMARY KEY,
//!     kind            TEXT NOT NULL,
//!     external_id     TEXT NOT NULL,
//!     payment_id      TEXT,
//!     amount_minor    BIGINT,
//!     currency        TEXT,
//!     event_type      TEXT NOT NULL,
//!     recorded_at     TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX ledger_intents_external_id ON ledger_intents (external_id);
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::OnConflict,
};

use super::{IntentKind, LedgerIntent, LedgerStore, RecordOutcome};
use crate::error::Result;
use crate::money::Money;

mod entity {
    pub mod ledger_intent {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "ledger_intents")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub idempotency_key: String,
            pub kind: String,
            pub external_id: String,
            pub payment_id: Option<String>,
            pub amount_minor: Option<i64>,
            pub currency: Option<String>,
            pub event_type: String,
            pub recorded_at: DateTimeWithTimeZone,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::ledger_intent;

/// Postgres ledger store.
#[derive(Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect using a database URL (e.g. `DATABASE_URL`).
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        tracing::info!(backend = ?db.get_database_backend(), "Ledger database connected");
        Ok(Self::new(db))
    }
}

fn intent_to_active_model(intent: &LedgerIntent) -> ledger_intent::ActiveModel {
    ledger_intent::ActiveModel {
        idempotency_key: Set(intent.idempotency_key.clone()),
        kind: Set(intent.kind.as_str().to_string()),
        external_id: Set(intent.external_id.clone()),
        payment_id: Set(intent.payment_id.clone()),
        amount_minor: Set(intent.amount.as_ref().map(Money::minor_units)),
        currency: Set(intent.amount.as_ref().and_then(|m| m.currency.clone())),
        event_type: Set(intent.event_type.clone()),
        recorded_at: Set(intent.recorded_at.fixed_offset()),
    }
}

fn model_to_intent(model: ledger_intent::Model) -> Result<LedgerIntent> {
    let kind: IntentKind = model.kind.parse()?;
    let amount = model.amount_minor.map(|amount| Money {
        amount,
        currency: model.currency,
    });

    Ok(LedgerIntent {
        kind,
        external_id: model.external_id,
        payment_id: model.payment_id,
        amount,
        idempotency_key: model.idempotency_key,
        event_type: model.event_type,
        recorded_at: model.recorded_at.with_timezone(&Utc),
    })
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn record(&self, intent: LedgerIntent) -> Result<RecordOutcome> {
        tracing::debug!(
            kind = %intent.kind,
            external_id = %intent.external_id,
            idempotency_key = %intent.idempotency_key,
            "recording ledger intent"
        );

        // ON CONFLICT DO NOTHING: a redelivered event affects zero rows
        let rows = ledger_intent::Entity::insert(intent_to_active_model(&intent))
            .on_conflict(
                OnConflict::column(ledger_intent::Column::IdempotencyKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if rows == 0 {
            Ok(RecordOutcome::Duplicate)
        } else {
            Ok(RecordOutcome::Recorded)
        }
    }

    async fn intents_for(&self, external_id: &str) -> Result<Vec<LedgerIntent>> {
        let models = ledger_intent::Entity::find()
            .filter(ledger_intent::Column::ExternalId.eq(external_id))
            .order_by_asc(ledger_intent::Column::RecordedAt)
            .all(&self.db)
            .await?;

        models.into_iter().map(model_to_intent).collect()
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}
