use crate::{
    app::AppContext,
    config::Config,
    error::Result,
    health,
    http::RouteModule,
    ledger::LedgerStore,
    middleware::MakeRequestUuid,
    ratelimit::build_rate_limit_layer,
    webhooks::WebhookModule,
};
use axum::{Router, extract::DefaultBodyLimit};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Main application structure
///
/// Serves the webhook receiver and health endpoint with the standard
/// middleware stack.
pub struct App {
    router: Router<AppContext>,
    config: Config,
    context: AppContext,
}

impl App {
    /// Creates a new App with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new App with the provided configuration
    ///
    /// Mounts `/health` and the webhook route at `config.webhook.path`. The
    /// signature key moves from the config into the webhook receiver.
    pub fn with_config(mut config: Config) -> Self {
        let router = Router::<AppContext>::new().merge(health::health_routes());
        let webhooks = WebhookModule::new(config.webhook.path.clone());

        let context = AppContext::builder()
            .with_signature_key_opt(config.webhook.signature_key.take())
            .with_signature_header(config.webhook.signature_header.clone())
            .build();

        Self {
            router,
            config,
            context,
        }
        .register_module(webhooks)
    }

    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Register a route module with the application
    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.router = module.register(self.router);
        self
    }

    /// Set the application context
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    /// Record intents into `ledger`, keeping the configured receiver settings
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerStore>) -> Self {
        self.context = self.context.with_ledger(ledger);
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the fully layered router with state applied
    ///
    /// # Errors
    ///
    /// Fails if the rate limiter backend cannot be constructed.
    pub fn into_router(self) -> Result<Router> {
        let App {
            router,
            config,
            context,
        } = self;

        Ok(Self::with_middleware(router, &config)?.with_state(context))
    }

    /// Apply middleware stack
    fn with_middleware(
        mut router: Router<AppContext>,
        config: &Config,
    ) -> Result<Router<AppContext>> {
        // Layers added later wrap earlier ones, so this list runs inner to outer.

        // 1. Body size limit - reject large bodies before they are buffered
        router = router.layer(DefaultBodyLimit::max(config.server.max_body_size));

        // 2. Timeout
        if let Some(timeout) = config.server.request_timeout() {
            tracing::debug!(timeout_secs = timeout.as_secs(), "Request timeout enabled");
            router = router.layer(TimeoutLayer::new(timeout));
        }

        // 3. Rate limiting - health checks are exempt inside the layer
        if let Some(rate_limit_layer) = build_rate_limit_layer(&config.rate_limit)? {
            router = router.layer(rate_limit_layer);
        }

        // 4. Trace layer - HTTP tracing
        router = router.layer(TraceLayer::new_for_http());

        // 5. Request ID - set outermost so the trace span and response carry it
        router = router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        Ok(router)
    }

    /// Start the application server
    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = self.config.server.addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server starting on http://{}", addr);
        tracing::info!("Health check available at http://{}/health", addr);
        tracing::info!(
            path = %self.config.webhook.path,
            configured = self.context.webhooks().is_configured(),
            "Square webhook receiver mounted"
        );

        let router = self.into_router()?;

        // ConnectInfo gives the rate limiter the peer address
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    context: Option<AppContext>,
    ledger: Option<Arc<dyn LedgerStore>>,
    modules: Vec<Router<AppContext>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            context: None,
            ledger: None,
            modules: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the context built from the config
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerStore>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.modules.push(module.register(Router::new()));
        self
    }

    pub fn build(self) -> App {
        let mut app = App::with_config(self.config);
        if let Some(context) = self.context {
            app = app.with_context(context);
        }
        if let Some(ledger) = self.ledger {
            app = app.with_ledger(ledger);
        }

        for module_router in self.modules {
            app.router = app.router.merge(module_router);
        }

        app
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::ratelimit::RateLimitConfig;
    use crate::testing;
    use axum::routing::get;

    struct SlowModule;

    impl RouteModule for SlowModule {
        fn routes(&self) -> Router<AppContext> {
            Router::new().route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "done"
                }),
            )
        }
    }

    fn app(timeout: Option<u64>) -> Router {
        let config = ConfigBuilder::new()
            .with_request_timeout(timeout)
            .with_rate_limit(RateLimitConfig::builder().enabled(false).build())
            .build()
            .unwrap();

        App::builder()
            .with_config(config)
            .register_module(SlowModule)
            .build()
            .into_router()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_request_times_out() {
        testing::get(app(Some(1)), "/slow")
            .execute()
            .await
            .assert_status(axum::http::StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_disabled() {
        testing::get(app(None), "/slow")
            .execute()
            .await
            .assert_ok()
            .assert_contains("done")
            .await;
    }
}
