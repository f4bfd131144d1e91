use crate::utils::get_env_with_prefix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How requests are grouped into buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// One bucket shared by every client.
    Global,
    /// One bucket per client IP.
    #[default]
    PerIp,
}

impl fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::PerIp => f.write_str("per_ip"),
        }
    }
}

impl FromStr for RateLimitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "per_ip" | "per-ip" | "ip" => Ok(Self::PerIp),
            other => Err(format!("unknown rate limit strategy: {}", other)),
        }
    }
}

/// Rate limiting configuration
///
/// Defaults to 100 requests per 60 seconds per client IP.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of requests allowed per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Time window in seconds for rate limiting
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    #[serde(default)]
    pub strategy: RateLimitStrategy,

    /// Trust X-Forwarded-For header for client IP detection
    ///
    /// **SECURITY WARNING**: Only enable this if the service sits behind
    /// a trusted reverse proxy that overwrites (not appends to) these headers,
    /// otherwise clients can spoof their IP to bypass rate limiting.
    ///
    /// Default: `false`
    #[serde(default)]
    pub trust_proxy: bool,

    /// Redis URL for a limiter shared across instances (feature `ratelimit-redis`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            strategy: RateLimitStrategy::default(),
            trust_proxy: false,
            redis_url: None,
        }
    }
}

impl RateLimitConfig {
    /// Create a new RateLimitConfig builder
    pub fn builder() -> RateLimitConfigBuilder {
        RateLimitConfigBuilder::new()
    }

    /// Load rate limit configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(enabled) = get_env_with_prefix("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.parse().unwrap_or(true);
        }

        if let Some(max_requests) = get_env_with_prefix("RATE_LIMIT_MAX_REQUESTS") {
            if let Ok(val) = max_requests.parse() {
                config.max_requests = val;
            }
        }

        if let Some(window) = get_env_with_prefix("RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(val) = window.parse() {
                config.window_seconds = val;
            }
        }

        if let Some(strategy) = get_env_with_prefix("RATE_LIMIT_STRATEGY") {
            match strategy.parse() {
                Ok(val) => config.strategy = val,
                Err(err) => tracing::warn!(error = %err, "Ignoring RATE_LIMIT_STRATEGY"),
            }
        }

        if let Some(trust_proxy) = get_env_with_prefix("RATE_LIMIT_TRUST_PROXY") {
            config.trust_proxy = trust_proxy.parse().unwrap_or(false);
        }

        config.redis_url = get_env_with_prefix("REDIS_URL");

        config
    }

    /// Check the values are usable when enabled.
    pub fn validate(&self) -> Result<(), String> {
        if !self.enabled {
            return Ok(());
        }
        if self.max_requests == 0 {
            return Err("rate_limit.max_requests must be greater than 0".to_string());
        }
        if self.window_seconds == 0 {
            return Err("rate_limit.window_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Builder for RateLimitConfig
#[must_use = "builder does nothing until you call build()"]
pub struct RateLimitConfigBuilder {
    config: RateLimitConfig,
}

impl RateLimitConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RateLimitConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn max_requests(mut self, max: u32) -> Self {
        self.config.max_requests = max;
        self
    }

    pub fn window_seconds(mut self, seconds: u64) -> Self {
        self.config.window_seconds = seconds;
        self
    }

    pub fn per_ip(mut self) -> Self {
        self.config.strategy = RateLimitStrategy::PerIp;
        self
    }

    pub fn global(mut self) -> Self {
        self.config.strategy = RateLimitStrategy::Global;
        self
    }

    /// Trust proxy headers (X-Forwarded-For, X-Real-IP) for client IP detection.
    ///
    /// **SECURITY WARNING**: Only enable this if behind a trusted reverse proxy.
    /// See [`RateLimitConfig::trust_proxy`] for details.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.config.trust_proxy = trust;
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.config.redis_url = Some(url.into());
        self
    }

    pub fn build(self) -> RateLimitConfig {
        self.config
    }
}

impl Default for RateLimitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_seconds() -> u64 {
    60
}
