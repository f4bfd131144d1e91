use crate::error::MoneyBuddyError;
use crate::webhooks::event::EventDecodeError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Errors raised while receiving a webhook.
///
/// Everything except `Handler` rejects the request. Response bodies are
/// deliberately coarse: they never include the secret, the expected MAC, or
/// payload content.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook signature key is not configured")]
    Configuration,

    #[error("Missing webhook signature header")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed webhook payload ({body_len} bytes, sha256 {body_sha256}): {reason}")]
    MalformedPayload {
        body_len: usize,
        body_sha256: String,
        reason: String,
    },

    #[error("Webhook handler failed: {0}")]
    Handler(String),
}

impl WebhookError {
    /// Build a `MalformedPayload` that identifies the body without echoing it.
    pub fn malformed(raw_body: &[u8], err: &serde_json::Error) -> Self {
        Self::MalformedPayload {
            body_len: raw_body.len(),
            body_sha256: hex::encode(Sha256::digest(raw_body)),
            // serde_json messages can quote payload fragments; keep position only
            reason: format!(
                "{:?} error at line {} column {}",
                err.classify(),
                err.line(),
                err.column()
            ),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MissingSignature => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload { .. } | Self::Handler(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the sender.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Configuration => "Webhook not configured",
            Self::MissingSignature => "Missing signature",
            Self::InvalidSignature => "Invalid signature",
            Self::MalformedPayload { .. } | Self::Handler(_) => "Webhook processing failed",
        }
    }
}

impl From<EventDecodeError> for WebhookError {
    fn from(err: EventDecodeError) -> Self {
        Self::Handler(err.to_string())
    }
}

impl From<MoneyBuddyError> for WebhookError {
    fn from(err: MoneyBuddyError) -> Self {
        Self::Handler(err.to_string())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match &self {
            Self::Configuration => {
                tracing::error!("Webhook rejected: signature key is not configured")
            }
            Self::MissingSignature | Self::InvalidSignature => {
                tracing::warn!(error = %self, "Webhook rejected")
            }
            Self::MalformedPayload {
                body_len,
                body_sha256,
                reason,
            } => tracing::error!(
                body_len = *body_len,
                body_sha256 = %body_sha256,
                reason = %reason,
                "Webhook payload could not be parsed"
            ),
            Self::Handler(message) => tracing::error!(error = %message, "Webhook handler failed"),
        }

        let body = Json(json!({ "error": self.public_message() }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(WebhookError::Configuration.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(WebhookError::MissingSignature.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(WebhookError::InvalidSignature.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            WebhookError::Handler("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_malformed_hides_content() {
        let body = br#"{"type": "payment.created", "secret_field": "hunter2""#;
        let err = serde_json::from_slice::<serde_json::Value>(body).unwrap_err();
        let webhook_err = WebhookError::malformed(body, &err);

        let rendered = webhook_err.to_string();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains(&body.len().to_string()));

        match webhook_err {
            WebhookError::MalformedPayload {
                body_len,
                body_sha256,
                ..
            } => {
                assert_eq!(body_len, body.len());
                assert_eq!(body_sha256.len(), 64);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_data_error_does_not_quote_values() {
        let body = br#"{"type": 4111111111111111}"#;
        let err = serde_json::from_slice::<crate::webhooks::EventEnvelope>(body).unwrap_err();
        let rendered = WebhookError::malformed(body, &err).to_string();
        assert!(!rendered.contains("4111111111111111"));
    }

    #[test]
    fn test_public_messages() {
        assert_eq!(WebhookError::Configuration.public_message(), "Webhook not configured");
        assert_eq!(WebhookError::MissingSignature.public_message(), "Missing signature");
        assert_eq!(WebhookError::InvalidSignature.public_message(), "Invalid signature");
        let err = WebhookError::MalformedPayload {
            body_len: 3,
            body_sha256: String::new(),
            reason: String::new(),
        };
        assert_eq!(err.public_message(), "Webhook processing failed");
    }
}
