use crate::app::AppContext;
use crate::http::RouteModule;
use crate::webhooks::DispatchResult;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;

/// Default mount point for the Square receiver.
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/webhooks/square";

/// Square webhook endpoint.
///
/// Takes the body as raw bytes so the signature is checked against exactly
/// what was sent.
pub async fn square_webhook(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let receiver = ctx.webhooks();

    // Non-UTF-8 header values cannot match a base64 MAC; keep them as invalid, not missing
    let signature = headers
        .get(receiver.signature_header())
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    match receiver.receive(&body, signature.as_deref()).await {
        Ok(result) => {
            if let DispatchResult::Failed { event_type, error } = &result {
                tracing::warn!(
                    event_type = %event_type,
                    error = %error,
                    "Webhook acknowledged despite handler failure"
                );
            }
            Json(json!({ "success": true })).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Route module mounting the Square webhook receiver.
pub struct WebhookModule {
    path: String,
}

impl WebhookModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for WebhookModule {
    fn default() -> Self {
        Self::new(DEFAULT_WEBHOOK_PATH)
    }
}

impl RouteModule for WebhookModule {
    fn routes(&self) -> Router<AppContext> {
        Router::new().route(&self.path, post(square_webhook))
    }
}
