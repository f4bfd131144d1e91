//! Rate limiter backends.
//!
//! The HTTP layer only sees [`RequestLimiter`], so the in-process GCRA limiter
//! can be swapped for a shared store when running several instances.

use super::config::{RateLimitConfig, RateLimitStrategy};
use crate::error::Result;
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed, keyed::DashMapStateStore},
};
use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

/// Shrink the keyed state store every N requests to prevent unbounded memory growth.
const SHRINK_INTERVAL: u64 = 1000;

/// Result of asking the limiter about one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Over the limit; retry after this many seconds (at least 1).
    Limited { retry_after: u64 },
}

/// Injected rate limiting capability.
#[async_trait]
pub trait RequestLimiter: Send + Sync {
    /// Decide whether a request from `key` (client identifier, if known) may proceed.
    async fn check(&self, key: Option<&str>) -> Result<RateDecision>;

    /// Boolean form of [`check`](Self::check). Backend errors allow the request.
    async fn allow(&self, identifier: &str) -> bool {
        match self.check(Some(identifier)).await {
            Ok(RateDecision::Allowed) => true,
            Ok(RateDecision::Limited { .. }) => false,
            Err(err) => {
                tracing::warn!(error = %err, "Rate limiter unavailable, allowing request");
                true
            }
        }
    }
}

type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;
type KeyedLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock, NoOpMiddleware>;

enum LimiterState {
    Global(GlobalLimiter),
    PerIp(KeyedLimiter),
}

/// In-process limiter backed by governor (GCRA, lock-free).
///
/// Allows `max_requests` as a burst and replenishes evenly over the window.
pub struct GovernorLimiter {
    limiter: LimiterState,
    clock: DefaultClock,
    request_count: AtomicU64,
}

impl GovernorLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let max_requests = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let window = Duration::from_secs(config.window_seconds.max(1));

        // Replenish one cell every window/max so a full window restores the whole burst
        let quota = Quota::with_period(window / max_requests.get())
            .unwrap_or_else(|| Quota::per_second(max_requests))
            .allow_burst(max_requests);

        let limiter = match config.strategy {
            RateLimitStrategy::PerIp => LimiterState::PerIp(RateLimiter::keyed(quota)),
            RateLimitStrategy::Global => LimiterState::Global(RateLimiter::direct(quota)),
        };

        Self {
            limiter,
            clock: DefaultClock::default(),
            request_count: AtomicU64::new(0),
        }
    }

    fn retry_after(&self, wait: Duration) -> u64 {
        // Round up so clients never retry early
        (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
    }
}

#[async_trait]
impl RequestLimiter for GovernorLimiter {
    async fn check(&self, key: Option<&str>) -> Result<RateDecision> {
        let outcome = match &self.limiter {
            LimiterState::PerIp(limiter) => {
                let count = self.request_count.fetch_add(1, Ordering::Relaxed);
                if count % SHRINK_INTERVAL == 0 && count > 0 {
                    limiter.retain_recent();
                }

                match key {
                    Some(ip) => limiter.check_key(&ip.to_string()),
                    // No client address available, allow the request
                    None => return Ok(RateDecision::Allowed),
                }
            }
            LimiterState::Global(limiter) => limiter.check(),
        };

        Ok(match outcome {
            Ok(()) => RateDecision::Allowed,
            Err(not_until) => RateDecision::Limited {
                retry_after: self.retry_after(not_until.wait_time_from(self.clock.now())),
            },
        })
    }
}

/// Build the limiter for a configuration.
///
/// With feature `ratelimit-redis` and a `redis_url`, a shared fixed-window
/// limiter is used; otherwise the in-process governor limiter.
pub fn build_limiter(config: &RateLimitConfig) -> Result<Arc<dyn RequestLimiter>> {
    #[cfg(feature = "ratelimit-redis")]
    if let Some(url) = &config.redis_url {
        let limiter = super::redis::RedisLimiter::new(url, config)?;
        tracing::info!("Using Redis rate limiter");
        return Ok(Arc::new(limiter));
    }

    #[cfg(not(feature = "ratelimit-redis"))]
    if config.redis_url.is_some() {
        tracing::warn!("REDIS_URL is set but feature `ratelimit-redis` is disabled; using in-process limiter");
    }

    Ok(Arc::new(GovernorLimiter::new(config)))
}
