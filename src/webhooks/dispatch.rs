use crate::webhooks::WebhookError;
use crate::webhooks::event::{EventEnvelope, PaymentEvent};
use crate::webhooks::handler::{EventHandler, HandlerEffect};
use std::sync::Arc;

/// Outcome of dispatching an accepted event.
///
/// Every variant is acknowledged to the sender with 200; rejections happen
/// earlier and are reported as [`WebhookError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// A known handler ran to completion.
    Handled {
        event_type: String,
        effect: HandlerEffect,
    },
    /// No handler exists for this event type.
    Ignored { event_type: String },
    /// A known handler failed. Logged, not surfaced to the sender.
    Failed { event_type: String, error: String },
}

impl DispatchResult {
    pub fn event_type(&self) -> &str {
        match self {
            Self::Handled { event_type, .. }
            | Self::Ignored { event_type }
            | Self::Failed { event_type, .. } => event_type,
        }
    }
}

/// Routes verified events to the handler, one shot per event.
///
/// Handler errors are caught here so they cannot change the acknowledgement
/// returned to the provider.
#[derive(Clone)]
pub struct EventDispatcher {
    handler: Arc<dyn EventHandler>,
}

impl EventDispatcher {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self { handler }
    }

    pub async fn dispatch(&self, envelope: &EventEnvelope) -> DispatchResult {
        let event_type = envelope.event_type.clone();

        let event = match PaymentEvent::decode(envelope) {
            Ok(event) => event,
            Err(err) => return self.fail(envelope, err.into()).await,
        };

        if let PaymentEvent::Unknown(_) = event {
            tracing::info!(event_type = %event_type, "Unhandled webhook event type");
            return DispatchResult::Ignored { event_type };
        }

        match self.handler.handle(&event, envelope).await {
            Ok(effect) => {
                tracing::info!(
                    event_id = envelope.event_id.as_deref().unwrap_or("-"),
                    event = %event,
                    "Webhook processed successfully"
                );
                DispatchResult::Handled { event_type, effect }
            }
            Err(err) => self.fail(envelope, err.into()).await,
        }
    }

    async fn fail(&self, envelope: &EventEnvelope, error: WebhookError) -> DispatchResult {
        self.handler.on_error(envelope, &error).await;
        DispatchResult::Failed {
            event_type: envelope.event_type.clone(),
            error: error.to_string(),
        }
    }
}
