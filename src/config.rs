use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{MoneyBuddyError, Result};
use crate::ratelimit::RateLimitConfig;
use crate::utils::get_env_with_prefix;
use crate::webhooks::DEFAULT_SIGNATURE_HEADER;
use crate::webhooks::routes::DEFAULT_WEBHOOK_PATH;

/// Main configuration for the Money Buddy webhook service
#[derive(Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub webhook: WebhookConfig,
    pub ledger: LedgerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 1MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Requests running longer than this are answered with 408; `None` disables it
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Square webhook receiver settings
///
/// The signature key is optional at load time. Without it the service still
/// starts, and every delivery is answered with a configuration error.
#[derive(Debug)]
pub struct WebhookConfig {
    pub signature_key: Option<SecretString>,
    pub signature_header: String,
    pub path: String,
}

/// Ledger storage settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// Postgres URL; used only with feature `database`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            webhook: WebhookConfig::default(),
            ledger: LedgerConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signature_key: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            path: DEFAULT_WEBHOOK_PATH.to_string(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn default_request_timeout_seconds() -> Option<u64> {
    Some(30)
}

impl ServerConfig {
    pub fn addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl WebhookConfig {
    pub fn is_configured(&self) -> bool {
        self.signature_key.is_some()
    }

    /// Load webhook settings from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.signature_key = get_env_with_prefix("SQUARE_WEBHOOK_SIGNATURE_KEY")
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        if let Some(header) = get_env_with_prefix("WEBHOOK_SIGNATURE_HEADER") {
            config.signature_header = header;
        }
        if let Some(path) = get_env_with_prefix("WEBHOOK_PATH") {
            config.path = path;
        }

        config
    }
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Set the maximum request body size in bytes
    ///
    /// # Example
    ///
    /// ```rust
    /// use money_buddy::config::ConfigBuilder;
    ///
    /// let config = ConfigBuilder::new()
    ///     .with_max_body_size(256 * 1024)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.server.max_body_size, 256 * 1024);
    /// ```
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.config.server.max_body_size = max_body_size;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_signature_key(mut self, key: impl Into<SecretString>) -> Self {
        self.config.webhook.signature_key = Some(key.into());
        self
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.config.webhook.signature_header = header.into();
        self
    }

    pub fn with_webhook_path(mut self, path: impl Into<String>) -> Self {
        self.config.webhook.path = path.into();
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.ledger.database_url = Some(url.into());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Set the per-request timeout in seconds, or `None` to disable it
    pub fn with_request_timeout(mut self, seconds: Option<u64>) -> Self {
        self.config.server.request_timeout_seconds = seconds;
        self
    }

    /// Load configuration from environment variables with MONEY_BUDDY_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = get_env_with_prefix("HOST") {
            self.config.server.host = host;
        }
        // Check MONEY_BUDDY_PORT first, fall back to PORT (for Railway/Heroku compatibility)
        if let Some(port) = get_env_with_prefix("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(max_body_size) = get_env_with_prefix("MAX_BODY_SIZE") {
            if let Ok(size) = max_body_size.parse() {
                self.config.server.max_body_size = size;
            }
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        self.config.webhook = WebhookConfig::from_env();
        self.config.ledger.database_url = get_env_with_prefix("DATABASE_URL");
        self.config.rate_limit = RateLimitConfig::from_env();

        if let Some(seconds) = get_env_with_prefix("TIMEOUT_SECONDS") {
            if let Ok(s) = seconds.parse() {
                self.config.server.request_timeout_seconds = Some(s);
            }
        }
        if get_env_with_prefix("TIMEOUT_ENABLED").is_some_and(|v| v.parse::<bool>().ok() == Some(false)) {
            self.config.server.request_timeout_seconds = None;
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid server address (host:port)
    /// - Invalid log level
    /// - Invalid timeout or rate limit values
    /// - Empty signature header name or webhook path
    ///
    /// A missing signature key is not an error.
    pub fn build(self) -> Result<Config> {
        let config = self.config;

        config.server.addr().map_err(|e| {
            MoneyBuddyError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                config.server.host, config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(MoneyBuddyError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if config.server.request_timeout_seconds == Some(0) {
            return Err(MoneyBuddyError::bad_request(
                "Request timeout must be greater than 0; unset it to disable",
            ));
        }
        config.rate_limit.validate().map_err(MoneyBuddyError::bad_request)?;

        if config.server.port == 0 {
            return Err(MoneyBuddyError::bad_request("Server port must be greater than 0"));
        }

        if config.server.max_body_size == 0 {
            return Err(MoneyBuddyError::bad_request(
                "Maximum body size must be greater than 0",
            ));
        }

        if config.webhook.signature_header.trim().is_empty() {
            return Err(MoneyBuddyError::bad_request(
                "Webhook signature header name must not be empty",
            ));
        }
        axum::http::HeaderName::from_bytes(config.webhook.signature_header.as_bytes()).map_err(
            |_| {
                MoneyBuddyError::bad_request(format!(
                    "Invalid webhook signature header name: {}",
                    config.webhook.signature_header
                ))
            },
        )?;

        if !config.webhook.path.starts_with('/') {
            return Err(MoneyBuddyError::bad_request(format!(
                "Webhook path must start with '/', got: {}",
                config.webhook.path
            )));
        }

        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.max_body_size, 1024 * 1024);
        assert_eq!(config.webhook.signature_header, "x-square-hmacsha256-signature");
        assert_eq!(config.webhook.path, "/api/webhooks/square");
        assert!(!config.webhook.is_configured());
        assert!(config.rate_limit.enabled);
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_log_level() {
        let result = ConfigBuilder::new().with_log_level("loud").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_host() {
        let result = ConfigBuilder::new().with_host("not a host").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_port_and_body() {
        assert!(ConfigBuilder::new().with_port(0).build().is_err());
        assert!(ConfigBuilder::new().with_max_body_size(0).build().is_err());
    }

    #[test]
    fn test_invalid_rate_limit() {
        let rate_limit = RateLimitConfig::builder().max_requests(0).build();
        assert!(ConfigBuilder::new().with_rate_limit(rate_limit).build().is_err());
    }

    #[test]
    fn test_invalid_webhook_settings() {
        assert!(ConfigBuilder::new().with_signature_header("").build().is_err());
        assert!(ConfigBuilder::new().with_signature_header("bad header").build().is_err());
        assert!(ConfigBuilder::new().with_webhook_path("webhooks").build().is_err());
    }

    #[test]
    fn test_request_timeout() {
        assert!(ConfigBuilder::new().with_request_timeout(Some(0)).build().is_err());

        let config = ConfigBuilder::new().with_request_timeout(None).build().unwrap();
        assert_eq!(config.server.request_timeout(), None);

        let config = ConfigBuilder::new().with_request_timeout(Some(5)).build().unwrap();
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_logging_and_ledger_settings() {
        let config = ConfigBuilder::new()
            .with_json_logging(true)
            .with_database_url("postgres://localhost/money_buddy")
            .build()
            .unwrap();

        assert!(config.logging.json);
        assert_eq!(
            config.ledger.database_url.as_deref(),
            Some("postgres://localhost/money_buddy")
        );
    }

    #[test]
    fn test_signature_key_redacted_in_debug() {
        let config = ConfigBuilder::new()
            .with_signature_key("super-secret-key")
            .build()
            .unwrap();

        assert!(config.webhook.is_configured());
        assert!(!format!("{:?}", config).contains("super-secret-key"));
    }
}
