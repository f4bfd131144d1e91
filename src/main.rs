use money_buddy::{App, ConfigBuilder, InMemoryLedger, LedgerStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigBuilder::new().from_env().build()?;
    money_buddy::init_tracing_with_config(&config);

    if !config.webhook.is_configured() {
        tracing::warn!(
            "MONEY_BUDDY_SQUARE_WEBHOOK_SIGNATURE_KEY is not set; webhook deliveries will be rejected"
        );
    }

    let ledger = connect_ledger(config.ledger.database_url.as_deref()).await?;

    App::with_config(config).with_ledger(ledger).serve().await
}

#[cfg(feature = "database")]
async fn connect_ledger(database_url: Option<&str>) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match database_url {
        Some(url) => {
            let store = money_buddy::SeaOrmLedgerStore::connect(url).await?;
            tracing::info!("Ledger backed by Postgres");
            Ok(Arc::new(store))
        }
        None => Ok(in_memory_ledger()),
    }
}

#[cfg(not(feature = "database"))]
async fn connect_ledger(database_url: Option<&str>) -> anyhow::Result<Arc<dyn LedgerStore>> {
    if database_url.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the `database` feature");
    }
    Ok(in_memory_ledger())
}

fn in_memory_ledger() -> Arc<dyn LedgerStore> {
    tracing::warn!("Using in-memory ledger; intents are lost on restart");
    Arc::new(InMemoryLedger::new())
}
