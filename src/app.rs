use crate::ledger::{InMemoryLedger, LedgerStore};
use crate::webhooks::{DEFAULT_SIGNATURE_HEADER, WebhookReceiver};
use secrecy::SecretString;
use std::sync::Arc;

/// Application context for dependency injection and shared state
///
/// Holds the ledger store and the webhook receiver. Handlers reach both
/// through `State<AppContext>`.
#[derive(Clone)]
pub struct AppContext {
    ledger: Arc<dyn LedgerStore>,
    webhooks: Arc<WebhookReceiver>,
}

impl AppContext {
    /// Context with an in-memory ledger and no webhook secret.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Builder pattern for constructing AppContext
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    pub fn webhooks(&self) -> &WebhookReceiver {
        &self.webhooks
    }

    /// Swap the ledger, rebuilding the receiver's dispatcher around it
    pub fn with_ledger(self, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            webhooks: Arc::new(self.webhooks.with_ledger(ledger.clone())),
            ledger,
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for AppContext with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppContextBuilder {
    ledger: Option<Arc<dyn LedgerStore>>,
    signature_key: Option<SecretString>,
    signature_header: String,
    receiver: Option<WebhookReceiver>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self {
            ledger: None,
            signature_key: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            receiver: None,
        }
    }

    /// Set the ledger store (defaults to [`InMemoryLedger`])
    pub fn with_ledger(mut self, ledger: Arc<dyn LedgerStore>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the webhook signature key
    pub fn with_signature_key(mut self, key: impl Into<SecretString>) -> Self {
        self.signature_key = Some(key.into());
        self
    }

    /// Set or clear the webhook signature key
    pub fn with_signature_key_opt(mut self, key: Option<SecretString>) -> Self {
        self.signature_key = key;
        self
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    /// Use a fully custom receiver; the signature key and header are ignored.
    pub fn with_receiver(mut self, receiver: WebhookReceiver) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn build(self) -> AppContext {
        let ledger = self
            .ledger
            .unwrap_or_else(|| Arc::new(InMemoryLedger::new()) as Arc<dyn LedgerStore>);

        let receiver = match self.receiver {
            Some(receiver) => receiver,
            None => WebhookReceiver::for_ledger(self.signature_key, ledger.clone())
                .with_signature_header(self.signature_header),
        };

        AppContext {
            ledger,
            webhooks: Arc::new(receiver),
        }
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
