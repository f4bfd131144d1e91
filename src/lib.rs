//! Money Buddy - Square payment webhook gateway
//!
//! Receives Square webhook deliveries, verifies their HMAC-SHA256 signature
//! against the exact request bytes, and turns payment, refund, and dispute
//! events into idempotent ledger intents.
//!
//! # Features
//!
//! - **Webhooks**: timing-safe signature verification and typed event dispatch
//! - **Ledger**: idempotent intent storage (in-memory, or Postgres via SeaORM
//!   with feature `database`)
//! - **Rate limiting**: per-IP GCRA limiter, or a shared Redis window with
//!   feature `ratelimit-redis`
//! - **Health Checks**: `/health` with a ledger connectivity check
//! - **Testing**: Alba-style HTTP testing utilities
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use money_buddy::{App, ConfigBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     money_buddy::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     App::with_config(config).serve().await
//! }
//! ```

mod app;
pub mod config;
mod core;
mod error;
pub mod health;
mod http;
pub mod ledger;
mod middleware;
pub mod money;
pub mod ratelimit;
pub mod testing;
pub mod utils;
pub mod webhooks;

// Re-exports for public API
pub use app::{AppContext, AppContextBuilder};
pub use config::{Config, ConfigBuilder, LedgerConfig, LoggingConfig, ServerConfig, WebhookConfig};
pub use core::{App, AppBuilder};
pub use error::{ErrorResponse, MoneyBuddyError, Result};
pub use health::{ComponentHealth, HealthCheck, HealthChecker, HealthStatus, LedgerHealthCheck};
pub use http::RouteModule;
pub use ledger::{InMemoryLedger, IntentKind, LedgerIntent, LedgerStore, RecordOutcome};
#[cfg(feature = "database")]
pub use ledger::SeaOrmLedgerStore;
pub use money::Money;
pub use ratelimit::{RateLimitConfig, RateLimitConfigBuilder, RequestLimiter};
pub use webhooks::{DispatchResult, PaymentEvent, WebhookError, WebhookReceiver};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early, typically in main() before creating the App.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "money_buddy=debug")
/// - `MONEY_BUDDY_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = utils::get_env_with_prefix("LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing with a custom configuration
///
/// `RUST_LOG`, when set, takes precedence over `config.logging.level`.
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
