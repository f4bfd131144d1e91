//! Test fixtures for Square webhook payloads
//!
//! Builders produce the exact JSON bytes a delivery would carry, and
//! [`sign_body`] signs them the way Square does.

use crate::webhooks::verification::sign_base64;
use serde_json::{Value, json};
use uuid::Uuid;

/// Base64 HMAC-SHA256 of `body` under `secret`, as sent in
/// `x-square-hmacsha256-signature`.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    sign_base64(body, secret)
}

/// Helper functions for generating fake identifiers
pub mod fake {
    use super::*;

    /// Generate a fake event id
    pub fn event_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Generate a fake Square-style object id with the given prefix
    pub fn object_id(prefix: &str) -> String {
        format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
    }
}

/// Builder for a Square webhook envelope
///
/// # Example
///
/// ```rust
/// use money_buddy::testing::SquareEvent;
///
/// let body = SquareEvent::payment_created("pay_1", "COMPLETED", 1000).to_bytes();
/// assert!(!body.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SquareEvent {
    event_type: String,
    event_id: Option<String>,
    object_key: Option<&'static str>,
    object: Value,
}

impl SquareEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_id: Some(fake::event_id()),
            object_key: None,
            object: Value::Null,
        }
    }

    pub fn payment_created(id: &str, status: &str, amount: i64) -> Self {
        Self::new("payment.created").with_object("payment", payment(id, status, amount))
    }

    pub fn payment_updated(id: &str, status: &str, amount: i64) -> Self {
        Self::new("payment.updated").with_object("payment", payment(id, status, amount))
    }

    pub fn refund_created(id: &str, payment_id: &str, amount: i64) -> Self {
        Self::new("refund.created").with_object(
            "refund",
            json!({
                "id": id,
                "status": "PENDING",
                "payment_id": payment_id,
                "amount_money": {"amount": amount, "currency": "USD"}
            }),
        )
    }

    pub fn refund_updated(id: &str, status: &str) -> Self {
        Self::new("refund.updated").with_object("refund", json!({"id": id, "status": status}))
    }

    pub fn dispute_created(id: &str, payment_id: &str) -> Self {
        Self::new("dispute.created").with_object(
            "dispute",
            json!({"id": id, "payment_id": payment_id, "state": "EVIDENCE_REQUIRED"}),
        )
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn without_event_id(mut self) -> Self {
        self.event_id = None;
        self
    }

    pub fn with_object(mut self, key: &'static str, object: Value) -> Self {
        self.object_key = Some(key);
        self.object = object;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut envelope = json!({
            "merchant_id": "ML_TEST",
            "type": self.event_type,
            "created_at": "2024-01-01T00:00:00Z",
        });

        if let Some(event_id) = &self.event_id {
            envelope["event_id"] = json!(event_id);
        }
        if let Some(key) = self.object_key {
            envelope["data"] = json!({
                "type": key,
                "id": self.object.get("id").cloned().unwrap_or(Value::Null),
                "object": { key: self.object }
            });
        }

        envelope
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_json().to_string().into_bytes()
    }
}

fn payment(id: &str, status: &str, amount: i64) -> Value {
    json!({
        "id": id,
        "status": status,
        "amount_money": {"amount": amount, "currency": "USD"}
    })
}
