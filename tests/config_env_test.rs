//! Environment-driven configuration
//!
//! Kept to a single test so the process environment is not mutated concurrently.

use money_buddy::ConfigBuilder;
use money_buddy::ratelimit::RateLimitStrategy;
use secrecy::ExposeSecret;

const KEYS: &[&str] = &[
    "MONEY_BUDDY_PORT",
    "MONEY_BUDDY_LOG_LEVEL",
    "MONEY_BUDDY_SQUARE_WEBHOOK_SIGNATURE_KEY",
    "MONEY_BUDDY_WEBHOOK_SIGNATURE_HEADER",
    "MONEY_BUDDY_WEBHOOK_PATH",
    "MONEY_BUDDY_RATE_LIMIT_MAX_REQUESTS",
    "MONEY_BUDDY_RATE_LIMIT_STRATEGY",
    "MONEY_BUDDY_TIMEOUT_SECONDS",
    "MONEY_BUDDY_TIMEOUT_ENABLED",
];

fn clear() {
    for key in KEYS {
        unsafe {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_from_env() {
    clear();
    unsafe {
        std::env::set_var("MONEY_BUDDY_PORT", "9090");
        std::env::set_var("MONEY_BUDDY_LOG_LEVEL", "debug");
        std::env::set_var("MONEY_BUDDY_SQUARE_WEBHOOK_SIGNATURE_KEY", "env-secret");
        std::env::set_var("MONEY_BUDDY_WEBHOOK_PATH", "/hooks/square");
        std::env::set_var("MONEY_BUDDY_RATE_LIMIT_MAX_REQUESTS", "10");
        std::env::set_var("MONEY_BUDDY_RATE_LIMIT_STRATEGY", "global");
        std::env::set_var("MONEY_BUDDY_TIMEOUT_SECONDS", "5");
    }

    let config = ConfigBuilder::new().from_env().build().unwrap();
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.webhook.signature_key.as_ref().unwrap().expose_secret(),
        "env-secret"
    );
    assert_eq!(config.webhook.signature_header, "x-square-hmacsha256-signature");
    assert_eq!(config.webhook.path, "/hooks/square");
    assert_eq!(config.rate_limit.max_requests, 10);
    assert_eq!(config.rate_limit.strategy, RateLimitStrategy::Global);
    assert_eq!(config.server.request_timeout_seconds, Some(5));

    // The secret never shows up in debug output
    assert!(!format!("{:?}", config).contains("env-secret"));

    unsafe {
        std::env::set_var("MONEY_BUDDY_TIMEOUT_ENABLED", "false");
    }
    let config = ConfigBuilder::new().from_env().build().unwrap();
    assert_eq!(config.server.request_timeout(), None);

    // An empty key is treated as absent, which is not a build error
    unsafe {
        std::env::set_var("MONEY_BUDDY_SQUARE_WEBHOOK_SIGNATURE_KEY", "");
    }
    let config = ConfigBuilder::new().from_env().build().unwrap();
    assert!(!config.webhook.is_configured());

    // Invalid values fail validation
    unsafe {
        std::env::set_var("MONEY_BUDDY_WEBHOOK_PATH", "no-leading-slash");
    }
    assert!(ConfigBuilder::new().from_env().build().is_err());

    clear();
}
