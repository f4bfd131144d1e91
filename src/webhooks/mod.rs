//! Square webhook handling.
//!
//! Provides signature verification, payload decoding, and dispatch of
//! payment, refund, and dispute events into the ledger.

pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler;
pub mod receiver;
pub mod routes;
pub mod verification;

pub use dispatch::{DispatchResult, EventDispatcher};
pub use error::WebhookError;
pub use event::{EventEnvelope, PaymentEvent};
pub use handler::{EventHandler, HandlerEffect, LedgerHandler};
pub use receiver::{DEFAULT_SIGNATURE_HEADER, WebhookReceiver};
pub use routes::WebhookModule;
pub use verification::{HmacSha256Verifier, SignatureEncoding, WebhookVerifier, sign_base64, verify};
