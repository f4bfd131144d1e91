use crate::error::{MoneyBuddyError, Result};
use crate::ledger::{IntentKind, LedgerIntent, LedgerStore, RecordOutcome};
use crate::webhooks::event::{
    Dispute, EventEnvelope, Payment, PaymentEvent, PaymentStatus, Refund, RefundStatus,
};
use async_trait::async_trait;
use std::sync::Arc;

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerEffect {
    /// A new intent was written to the ledger.
    Recorded(IntentKind),
    /// The intent was already in the ledger; nothing changed.
    Duplicate(IntentKind),
    /// The event did not call for a ledger entry (e.g. a pending payment).
    NoAction,
}

/// Trait for handling decoded webhook events
///
/// The dispatcher only calls `handle` for known event types; `Unknown`
/// events never reach a handler.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle the webhook event
    async fn handle(&self, event: &PaymentEvent, envelope: &EventEnvelope)
    -> Result<HandlerEffect>;

    /// Optional: Handle errors that occur during processing
    async fn on_error(
        &self,
        envelope: &EventEnvelope,
        error: &crate::webhooks::WebhookError,
    ) {
        tracing::error!(
            event_id = envelope.event_id.as_deref().unwrap_or("-"),
            event_type = %envelope.event_type,
            error = %error,
            "Webhook processing failed"
        );
    }
}

/// Turns payment events into ledger intents.
pub struct LedgerHandler {
    ledger: Arc<dyn LedgerStore>,
}

impl LedgerHandler {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// The intent an event calls for, if any. Pure; does not touch the ledger.
    ///
    /// # Errors
    ///
    /// Deposits and refunds without `amount_money` are rejected, so nothing is
    /// recorded and a corrected redelivery can still be applied.
    pub fn intent_for(
        event: &PaymentEvent,
        envelope: &EventEnvelope,
    ) -> Result<Option<LedgerIntent>> {
        let intent = match event {
            PaymentEvent::PaymentCreated(payment) => match payment.status {
                PaymentStatus::Completed => {
                    let intent = payment_intent(IntentKind::Deposit, payment, envelope);
                    Some(require_amount(intent)?)
                }
                _ => None,
            },
            PaymentEvent::PaymentUpdated(payment) => match payment.status {
                PaymentStatus::Failed | PaymentStatus::Canceled => {
                    Some(payment_intent(IntentKind::Reversal, payment, envelope))
                }
                _ => None,
            },
            PaymentEvent::RefundCreated(refund) => {
                let intent = refund_intent(IntentKind::Refund, refund, envelope);
                Some(require_amount(intent)?)
            }
            PaymentEvent::RefundUpdated(refund) => match refund.status {
                RefundStatus::Completed => {
                    Some(refund_intent(IntentKind::RefundCompleted, refund, envelope))
                }
                _ => None,
            },
            PaymentEvent::DisputeCreated(dispute) => dispute_intent(dispute, envelope),
            PaymentEvent::Unknown(_) => None,
        };

        Ok(intent)
    }
}

fn require_amount(intent: LedgerIntent) -> Result<LedgerIntent> {
    if intent.amount.is_none() {
        return Err(MoneyBuddyError::bad_request(format!(
            "{} {} has no amount_money",
            intent.event_type, intent.external_id
        )));
    }
    Ok(intent)
}

fn dispute_intent(dispute: &Dispute, envelope: &EventEnvelope) -> Option<LedgerIntent> {
    let id = dispute.external_id()?;
    let mut intent = LedgerIntent::new(
        IntentKind::Dispute,
        id,
        envelope.idempotency_key(id),
        &envelope.event_type,
    );
    if let Some(payment_id) = dispute.payment_id() {
        intent = intent.with_payment_id(payment_id);
    }
    if let Some(amount) = &dispute.amount_money {
        intent = intent.with_amount(amount.clone());
    }
    Some(intent)
}

fn payment_intent(kind: IntentKind, payment: &Payment, envelope: &EventEnvelope) -> LedgerIntent {
    let intent = LedgerIntent::new(
        kind,
        &payment.id,
        envelope.idempotency_key(&payment.id),
        &envelope.event_type,
    );

    match &payment.amount_money {
        Some(amount) => intent.with_amount(amount.clone()),
        None => intent,
    }
}

fn refund_intent(kind: IntentKind, refund: &Refund, envelope: &EventEnvelope) -> LedgerIntent {
    let mut intent = LedgerIntent::new(
        kind,
        &refund.id,
        envelope.idempotency_key(&refund.id),
        &envelope.event_type,
    );
    if let Some(payment_id) = &refund.payment_id {
        intent = intent.with_payment_id(payment_id);
    }
    if let Some(amount) = &refund.amount_money {
        intent = intent.with_amount(amount.clone());
    }
    intent
}

#[async_trait]
impl EventHandler for LedgerHandler {
    async fn handle(
        &self,
        event: &PaymentEvent,
        envelope: &EventEnvelope,
    ) -> Result<HandlerEffect> {
        let Some(intent) = Self::intent_for(event, envelope)? else {
            tracing::debug!(event = %event, "No ledger action for event");
            return Ok(HandlerEffect::NoAction);
        };

        let kind = intent.kind;
        let external_id = intent.external_id.clone();
        let amount = intent.amount.as_ref().map(|m| m.major_units().to_string());

        match self.ledger.record(intent).await? {
            RecordOutcome::Recorded => {
                match kind {
                    IntentKind::Dispute => tracing::warn!(
                        dispute_id = %external_id,
                        "Dispute created, manual review required"
                    ),
                    _ => tracing::info!(
                        kind = %kind,
                        external_id = %external_id,
                        amount = amount.as_deref().unwrap_or("-"),
                        "Ledger intent recorded"
                    ),
                }
                Ok(HandlerEffect::Recorded(kind))
            }
            RecordOutcome::Duplicate => {
                tracing::debug!(
                    kind = %kind,
                    external_id = %external_id,
                    "Skipping already recorded event"
                );
                Ok(HandlerEffect::Duplicate(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use serde_json::json;

    fn envelope(value: serde_json::Value) -> EventEnvelope {
        serde_json::from_value(value).unwrap()
    }

    fn payment_envelope(event_type: &str, status: &str, amount: i64) -> EventEnvelope {
        envelope(json!({
            "type": event_type,
            "event_id": format!("evt_{}_{}", event_type, status),
            "data": {"object": {"payment": {
                "id": "pay_1",
                "status": status,
                "amount_money": {"amount": amount, "currency": "USD"}
            }}}
        }))
    }

    fn intent(env: &EventEnvelope) -> Option<LedgerIntent> {
        let event = PaymentEvent::decode(env).unwrap();
        LedgerHandler::intent_for(&event, env).unwrap()
    }

    #[test]
    fn test_completed_payment_is_deposit() {
        let env = payment_envelope("payment.created", "COMPLETED", 2550);
        let intent = intent(&env).unwrap();

        assert_eq!(intent.kind, IntentKind::Deposit);
        assert_eq!(intent.external_id, "pay_1");
        assert_eq!(intent.amount.unwrap().major_units().to_string(), "25.50");
        assert_eq!(intent.idempotency_key, "evt_payment.created_COMPLETED");
    }

    #[test]
    fn test_lowercase_status_matches() {
        let env = payment_envelope("payment.created", "completed", 100);
        assert_eq!(intent(&env).unwrap().kind, IntentKind::Deposit);
    }

    #[test]
    fn test_pending_payment_no_intent() {
        let env = payment_envelope("payment.created", "PENDING", 100);
        assert!(intent(&env).is_none());
    }

    #[test]
    fn test_failed_or_canceled_update_is_reversal() {
        for status in ["FAILED", "CANCELED"] {
            let env = payment_envelope("payment.updated", status, 100);
            assert_eq!(intent(&env).unwrap().kind, IntentKind::Reversal);
        }

        let env = payment_envelope("payment.updated", "COMPLETED", 100);
        assert!(intent(&env).is_none());
    }

    #[test]
    fn test_refunds() {
        let created = envelope(json!({
            "type": "refund.created",
            "data": {"object": {"refund": {
                "id": "ref_1",
                "status": "PENDING",
                "payment_id": "pay_1",
                "amount_money": {"amount": 500}
            }}}
        }));
        let refund = intent(&created).unwrap();
        assert_eq!(refund.kind, IntentKind::Refund);
        assert_eq!(refund.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(refund.idempotency_key, "refund.created:ref_1");

        let updated = envelope(json!({
            "type": "refund.updated",
            "data": {"object": {"refund": {"id": "ref_1", "status": "COMPLETED"}}}
        }));
        assert_eq!(intent(&updated).unwrap().kind, IntentKind::RefundCompleted);

        let rejected = envelope(json!({
            "type": "refund.updated",
            "data": {"object": {"refund": {"id": "ref_1", "status": "REJECTED"}}}
        }));
        assert!(intent(&rejected).is_none());
    }

    #[test]
    fn test_dispute() {
        let env = envelope(json!({
            "type": "dispute.created",
            "event_id": "evt_d",
            "data": {"object": {"dispute": {"id": "dp_1", "payment_id": "pay_1"}}}
        }));
        let intent = intent(&env).unwrap();
        assert_eq!(intent.kind, IntentKind::Dispute);
        assert_eq!(intent.external_id, "dp_1");
        assert_eq!(intent.payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn test_unknown_no_intent() {
        let env = envelope(json!({"type": "invoice.created"}));
        assert!(intent(&env).is_none());
    }

    #[tokio::test]
    async fn test_handle_records_once() {
        let ledger = InMemoryLedger::new();
        let handler = LedgerHandler::new(Arc::new(ledger.clone()));
        let env = payment_envelope("payment.created", "COMPLETED", 1000);
        let event = PaymentEvent::decode(&env).unwrap();

        let first = handler.handle(&event, &env).await.unwrap();
        assert_eq!(first, HandlerEffect::Recorded(IntentKind::Deposit));

        let second = handler.handle(&event, &env).await.unwrap();
        assert_eq!(second, HandlerEffect::Duplicate(IntentKind::Deposit));

        assert_eq!(ledger.len().await, 1);
    }

    #[test]
    fn test_deposit_and_refund_require_amount() {
        let deposit = envelope(json!({
            "type": "payment.created",
            "data": {"object": {"payment": {"id": "pay_x", "status": "COMPLETED"}}}
        }));
        let refund = envelope(json!({
            "type": "refund.created",
            "data": {"object": {"refund": {"id": "ref_x", "status": "PENDING"}}}
        }));

        for env in [deposit, refund] {
            let event = PaymentEvent::decode(&env).unwrap();
            let err = LedgerHandler::intent_for(&event, &env).unwrap_err();
            assert!(matches!(err, MoneyBuddyError::BadRequest(_)));
        }

        // Reversals and settled refunds carry no amount requirement
        let reversal = envelope(json!({
            "type": "payment.updated",
            "data": {"object": {"payment": {"id": "pay_x", "status": "FAILED"}}}
        }));
        assert_eq!(intent(&reversal).unwrap().kind, IntentKind::Reversal);
    }

    #[tokio::test]
    async fn test_amountless_deposit_not_recorded_then_redelivery_applies() {
        let ledger = InMemoryLedger::new();
        let handler = LedgerHandler::new(Arc::new(ledger.clone()));

        let broken = envelope(json!({
            "type": "payment.created",
            "event_id": "evt_fix",
            "data": {"object": {"payment": {"id": "pay_x", "status": "COMPLETED"}}}
        }));
        let event = PaymentEvent::decode(&broken).unwrap();
        assert!(handler.handle(&event, &broken).await.is_err());
        assert!(ledger.is_empty().await);

        let fixed = envelope(json!({
            "type": "payment.created",
            "event_id": "evt_fix",
            "data": {"object": {"payment": {
                "id": "pay_x",
                "status": "COMPLETED",
                "amount_money": {"amount": 700, "currency": "USD"}
            }}}
        }));
        let event = PaymentEvent::decode(&fixed).unwrap();
        assert_eq!(
            handler.handle(&event, &fixed).await.unwrap(),
            HandlerEffect::Recorded(IntentKind::Deposit)
        );
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_handle_no_action() {
        let ledger = InMemoryLedger::new();
        let handler = LedgerHandler::new(Arc::new(ledger.clone()));
        let env = payment_envelope("payment.created", "APPROVED", 1000);
        let event = PaymentEvent::decode(&env).unwrap();

        assert_eq!(handler.handle(&event, &env).await.unwrap(), HandlerEffect::NoAction);
        assert!(ledger.is_empty().await);
    }
}
