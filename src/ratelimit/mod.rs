//! Rate limiting middleware.
//!
//! Provides per-IP and global rate limiting behind the injectable
//! [`RequestLimiter`] trait, with an in-process governor backend and an
//! optional shared Redis backend.

mod config;
mod layer;
mod limiter;
#[cfg(feature = "ratelimit-redis")]
mod redis;

pub use config::{RateLimitConfig, RateLimitConfigBuilder, RateLimitStrategy};
pub use layer::{RateLimitLayer, RateLimitService, build_rate_limit_layer};
pub use limiter::{GovernorLimiter, RateDecision, RequestLimiter, build_limiter};
#[cfg(feature = "ratelimit-redis")]
pub use redis::RedisLimiter;
