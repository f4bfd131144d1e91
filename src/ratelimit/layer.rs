//! Tower layer enforcing a [`RequestLimiter`] on every request except health checks.

use super::config::RateLimitConfig;
use super::limiter::{RateDecision, RequestLimiter, build_limiter};
use crate::error::Result;
use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};
use tower::{Layer, Service};

/// Custom error response for rate limit exceeded
#[derive(serde::Serialize)]
struct RateLimitError {
    error: String,
    message: String,
    retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", self.retry_after.to_string())],
            axum::Json(self),
        )
            .into_response()
    }
}

/// Client identifier for rate limiting.
///
/// SECURITY: proxy headers are only consulted when `trust_proxy` is set;
/// otherwise a client could spoof its IP and bypass per-IP limits.
fn client_ip(headers: &HeaderMap, connect: Option<SocketAddr>, trust_proxy: bool) -> Option<String> {
    let from_connection = || connect.map(|addr| addr.ip().to_string());

    if !trust_proxy {
        return from_connection();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        // "client, proxy1, proxy2": the leftmost is the original client
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(from_connection)
}

fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// Tower layer for rate limiting
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<dyn RequestLimiter>,
    trust_proxy: bool,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<dyn RequestLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}

/// Tower service for rate limiting
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<dyn RequestLimiter>,
    trust_proxy: bool,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request> + Clone + Send + Sync + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut svc = std::mem::replace(&mut self.inner, clone);

        if is_exempt(req.uri().path()) {
            return Box::pin(async move {
                let response = svc.call(req).await?;
                Ok(response.into_response())
            });
        }

        let connect = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let ip = client_ip(req.headers(), connect, self.trust_proxy);
        let limiter = self.limiter.clone();

        Box::pin(async move {
            let decision = match limiter.check(ip.as_deref()).await {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::warn!(error = %err, "Rate limiter unavailable, allowing request");
                    RateDecision::Allowed
                }
            };

            match decision {
                RateDecision::Allowed => {
                    let response = svc.call(req).await?;
                    Ok(response.into_response())
                }
                RateDecision::Limited { retry_after } => {
                    tracing::warn!(
                        client = ip.as_deref().unwrap_or("-"),
                        retry_after,
                        "Rate limit exceeded"
                    );
                    Ok(RateLimitError {
                        error: "rate_limit_exceeded".to_string(),
                        message: format!(
                            "Rate limit exceeded. Please try again in {} seconds",
                            retry_after
                        ),
                        retry_after,
                    }
                    .into_response())
                }
            }
        })
    }
}

/// Build a rate limit layer from RateLimitConfig
///
/// Returns `Ok(None)` if rate limiting is disabled.
pub fn build_rate_limit_layer(config: &RateLimitConfig) -> Result<Option<RateLimitLayer>> {
    if !config.enabled {
        return Ok(None);
    }

    let limiter = build_limiter(config)?;
    Ok(Some(RateLimitLayer::new(limiter, config.trust_proxy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn addr() -> Option<SocketAddr> {
        Some("203.0.113.7:4000".parse().unwrap())
    }

    #[test]
    fn test_client_ip_ignores_headers_without_trust() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4")]);
        assert_eq!(client_ip(&h, addr(), false).as_deref(), Some("203.0.113.7"));
        assert_eq!(client_ip(&h, None, false), None);
    }

    #[test]
    fn test_client_ip_trusted_proxy() {
        let h = headers(&[("x-forwarded-for", "1.2.3.4, 10.0.0.1"), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(client_ip(&h, addr(), true).as_deref(), Some("1.2.3.4"));

        let h = headers(&[("x-real-ip", "5.6.7.8")]);
        assert_eq!(client_ip(&h, addr(), true).as_deref(), Some("5.6.7.8"));

        let h = headers(&[]);
        assert_eq!(client_ip(&h, addr(), true).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_health_is_exempt() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/health/live"));
        assert!(!is_exempt("/healthz"));
        assert!(!is_exempt("/api/webhooks/square"));
    }

    #[test]
    fn test_disabled_builds_nothing() {
        let config = RateLimitConfig::builder().enabled(false).build();
        assert!(build_rate_limit_layer(&config).unwrap().is_none());
    }
}
