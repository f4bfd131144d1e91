use crate::ledger::LedgerStore;
use crate::webhooks::dispatch::{DispatchResult, EventDispatcher};
use crate::webhooks::event::EventEnvelope;
use crate::webhooks::handler::LedgerHandler;
use crate::webhooks::verification::{HmacSha256Verifier, WebhookVerifier};
use crate::webhooks::WebhookError;
use secrecy::SecretString;
use std::sync::Arc;

/// Default header carrying Square's signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

/// Orchestrates one delivery: configuration check, signature presence,
/// verification, parsing, dispatch.
///
/// The checks run in that order, so a missing secret is always reported as a
/// configuration error and never as a signature mismatch.
///
/// # Example
///
/// ```rust,ignore
/// let receiver = WebhookReceiver::for_ledger(config.webhook.signature_key.take(), ledger);
/// let result = receiver.receive(&body, signature).await?;
/// ```
#[derive(Clone)]
pub struct WebhookReceiver {
    verifier: Option<Arc<dyn WebhookVerifier>>,
    dispatcher: EventDispatcher,
    signature_header: String,
}

impl WebhookReceiver {
    /// Receiver verifying with HMAC-SHA256/base64. `None` means the secret is
    /// not configured and every delivery is rejected with a configuration error.
    pub fn new(secret: Option<SecretString>, dispatcher: EventDispatcher) -> Self {
        let verifier = secret.map(|secret| {
            Arc::new(HmacSha256Verifier::new(secret)) as Arc<dyn WebhookVerifier>
        });
        Self::with_verifier(verifier, dispatcher)
    }

    pub fn with_verifier(
        verifier: Option<Arc<dyn WebhookVerifier>>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            verifier,
            dispatcher,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
        }
    }

    /// Receiver that records intents into `ledger`.
    pub fn for_ledger(secret: Option<SecretString>, ledger: Arc<dyn LedgerStore>) -> Self {
        let handler = Arc::new(LedgerHandler::new(ledger));
        Self::new(secret, EventDispatcher::new(handler))
    }

    /// Same verifier and header, dispatching into a different ledger.
    pub fn with_ledger(&self, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            verifier: self.verifier.clone(),
            dispatcher: EventDispatcher::new(Arc::new(LedgerHandler::new(ledger))),
            signature_header: self.signature_header.clone(),
        }
    }

    /// Override the header the signature is read from.
    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into().to_ascii_lowercase();
        self
    }

    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    pub fn is_configured(&self) -> bool {
        self.verifier.is_some()
    }

    /// Process a delivery given the raw body bytes and the signature header value.
    ///
    /// `raw_body` must be exactly the bytes received; re-serialized JSON will
    /// not verify.
    pub async fn receive(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<DispatchResult, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or(WebhookError::Configuration)?;

        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;

        let valid = match verifier.verify_signature(raw_body, signature).await {
            Ok(valid) => valid,
            Err(err) => {
                tracing::warn!(error = %err, "Signature verification errored, treating as invalid");
                false
            }
        };
        if !valid {
            return Err(WebhookError::InvalidSignature);
        }

        let envelope = EventEnvelope::from_slice(raw_body)
            .map_err(|err| WebhookError::malformed(raw_body, &err))?;

        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = envelope.event_id.as_deref().unwrap_or("-"),
            merchant_id = envelope.merchant_id.as_deref().unwrap_or("-"),
            "Webhook signature verified"
        );

        Ok(self.dispatcher.dispatch(&envelope).await)
    }
}
