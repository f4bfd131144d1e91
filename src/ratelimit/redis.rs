use super::config::{RateLimitConfig, RateLimitStrategy};
use super::limiter::{RateDecision, RequestLimiter};
use crate::error::{MoneyBuddyError, Result};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

const KEY_PREFIX: &str = "money_buddy:ratelimit";

/// Fixed-window limiter shared through Redis
///
/// Each window is a counter key `INCR`ed per request and expired after the
/// window, so every instance pointed at the same Redis shares one budget.
#[derive(Clone)]
pub struct RedisLimiter {
    client: redis::Client,
    max_requests: u64,
    window_seconds: u64,
    strategy: RateLimitStrategy,
}

impl RedisLimiter {
    /// Create a new limiter from a connection URL
    pub fn new(url: &str, config: &RateLimitConfig) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            MoneyBuddyError::internal(format!("Failed to create Redis client: {}", e))
        })?;

        Ok(Self {
            client,
            max_requests: u64::from(config.max_requests.max(1)),
            window_seconds: config.window_seconds.max(1),
            strategy: config.strategy,
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                MoneyBuddyError::service_unavailable(format!("Failed to get Redis connection: {}", e))
            })
    }

    fn window_key(&self, bucket: &str, now_secs: u64) -> String {
        format!("{}:{}:{}", KEY_PREFIX, bucket, now_secs / self.window_seconds)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl RequestLimiter for RedisLimiter {
    async fn check(&self, key: Option<&str>) -> Result<RateDecision> {
        let bucket = match (self.strategy, key) {
            (RateLimitStrategy::Global, _) => "global",
            (RateLimitStrategy::PerIp, Some(ip)) => ip,
            (RateLimitStrategy::PerIp, None) => return Ok(RateDecision::Allowed),
        };

        let now = unix_now();
        let redis_key = self.window_key(bucket, now);
        let mut conn = self.get_connection().await?;

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(&redis_key, 1u64)
            .expire(&redis_key, self.window_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                MoneyBuddyError::service_unavailable(format!("Redis INCR failed: {}", e))
            })?;

        if count <= self.max_requests {
            Ok(RateDecision::Allowed)
        } else {
            Ok(RateDecision::Limited {
                retry_after: (self.window_seconds - now % self.window_seconds).max(1),
            })
        }
    }
}
