//! Square webhook payloads.
//!
//! The envelope is parsed first; the typed object under `data.object.<kind>`
//! is decoded only once the event type is known. Unknown event types never
//! touch `data` at all, and metadata fields of an unexpected shape are
//! dropped rather than rejected.

use crate::money::Money;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

pub const PAYMENT_CREATED: &str = "payment.created";
pub const PAYMENT_UPDATED: &str = "payment.updated";
pub const REFUND_CREATED: &str = "refund.created";
pub const REFUND_UPDATED: &str = "refund.updated";
pub const DISPUTE_CREATED: &str = "dispute.created";

/// Outer webhook envelope as delivered by Square.
///
/// Only `type` is required. `data` stays raw JSON until a known event type
/// asks for its object.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Strings pass through, numbers are rendered, anything else is absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl EventEnvelope {
    pub fn from_slice(raw_body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw_body)
    }

    /// Decode `data.object.<key>` into a typed object.
    pub fn object<T: DeserializeOwned>(&self, key: &'static str) -> Result<T, EventDecodeError> {
        let value = self
            .data
            .get("object")
            .and_then(|object| object.get(key))
            .ok_or(EventDecodeError::MissingObject { key })?;

        T::deserialize(value).map_err(|source| EventDecodeError::InvalidObject { key, source })
    }

    /// Deduplication key for side effects of this event.
    ///
    /// Square assigns every event a unique `event_id` and reuses it on
    /// redelivery. Without one, the event type and object id identify the
    /// change.
    pub fn idempotency_key(&self, object_id: &str) -> String {
        match self.event_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}:{}", self.event_type, object_id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("event has no data.object.{key}")]
    MissingObject { key: &'static str },
    #[error("data.object.{key} is invalid: {source}")]
    InvalidObject {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Payment status, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PaymentStatus {
    Approved,
    Pending,
    Completed,
    Canceled,
    Failed,
    Other(String),
}

impl From<String> for PaymentStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "APPROVED" => Self::Approved,
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "CANCELED" | "CANCELLED" => Self::Canceled,
            "FAILED" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

/// Refund status, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum RefundStatus {
    Pending,
    Completed,
    Rejected,
    Failed,
    Other(String),
}

impl From<String> for RefundStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "REJECTED" => Self::Rejected,
            "FAILED" => Self::Failed,
            _ => Self::Other(raw),
        }
    }
}

impl Default for RefundStatus {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount_money: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Refund {
    pub id: String,
    #[serde(default)]
    pub status: RefundStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub amount_money: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisputedPayment {
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dispute {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub dispute_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub disputed_payment: Option<DisputedPayment>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub amount_money: Option<Money>,
}

impl Dispute {
    pub fn external_id(&self) -> Option<&str> {
        self.id.as_deref().or(self.dispute_id.as_deref())
    }

    /// The disputed payment, from either the flat or nested field.
    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id
            .as_deref()
            .or_else(|| self.disputed_payment.as_ref().map(|p| p.payment_id.as_str()))
    }
}

/// A verified event, decoded by type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    PaymentCreated(Payment),
    PaymentUpdated(Payment),
    RefundCreated(Refund),
    RefundUpdated(Refund),
    DisputeCreated(Dispute),
    /// Any event type without a handler; carries the type string.
    Unknown(String),
}

impl PaymentEvent {
    pub fn decode(envelope: &EventEnvelope) -> Result<Self, EventDecodeError> {
        let event = match envelope.event_type.as_str() {
            PAYMENT_CREATED => Self::PaymentCreated(envelope.object("payment")?),
            PAYMENT_UPDATED => Self::PaymentUpdated(envelope.object("payment")?),
            REFUND_CREATED => Self::RefundCreated(envelope.object("refund")?),
            REFUND_UPDATED => Self::RefundUpdated(envelope.object("refund")?),
            DISPUTE_CREATED => Self::DisputeCreated(envelope.object("dispute")?),
            other => Self::Unknown(other.to_string()),
        };

        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::PaymentCreated(_) => PAYMENT_CREATED,
            Self::PaymentUpdated(_) => PAYMENT_UPDATED,
            Self::RefundCreated(_) => REFUND_CREATED,
            Self::RefundUpdated(_) => REFUND_UPDATED,
            Self::DisputeCreated(_) => DISPUTE_CREATED,
            Self::Unknown(event_type) => event_type,
        }
    }

    /// Provider id of the object the event is about, if any.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            Self::PaymentCreated(p) | Self::PaymentUpdated(p) => Some(&p.id),
            Self::RefundCreated(r) | Self::RefundUpdated(r) => Some(&r.id),
            Self::DisputeCreated(d) => d.external_id(),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for PaymentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id() {
            Some(id) => write!(f, "{} ({})", self.event_type(), id),
            None => f.write_str(self.event_type()),
        }
    }
}
