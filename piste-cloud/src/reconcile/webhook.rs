//! Gateway webhook reconciliation (payload already verified)

use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::models::{AMOUNT_MISMATCH, LedgerStatus, PaymentApproval, PaymentStatus};
use shared::payment::WebhookAck;
use shared::util::now_millis;

use super::Reconciler;
use crate::error::ServiceResult;
use crate::gateway::client::parse_approved_at;
use crate::gateway::webhook::{SECRET_FIELD, WebhookEvent};

/// Payload as stored on the ledger, without the shared secret
fn ledger_metadata(payload: &Value) -> Value {
    let mut payload = payload.clone();
    if let Some(obj) = payload.as_object_mut() {
        obj.remove(SECRET_FIELD);
    }
    json!({ "webhook": payload })
}

impl Reconciler {
    /// Unknown or foreign orders are acknowledged as ignored so the
    /// gateway's retry loop stops.
    pub async fn handle_webhook(&self, payload: &Value) -> ServiceResult<WebhookAck> {
        let event = WebhookEvent::from_payload(payload);
        let Some(order_id) = event.order_id.as_deref() else {
            tracing::debug!(event_type = ?event.event_type, "Webhook without orderId ignored");
            return Ok(WebhookAck::ignored());
        };
        let Some(attempt) = self.ledger.find_attempt(order_id).await? else {
            tracing::warn!(order_id = %order_id, "Webhook for unknown order ignored");
            return Ok(WebhookAck::ignored());
        };

        let status = event.mapped_status();
        let metadata = ledger_metadata(payload);
        let now = now_millis();
        tracing::info!(
            order_id = %order_id,
            status = ?event.status,
            event_type = ?event.event_type,
            mapped = status.as_db(),
            "Payment webhook received"
        );

        match status {
            LedgerStatus::Paid => {
                if attempt.is_settled() {
                    self.resume_settled(&attempt, "webhook").await?;
                    return Ok(WebhookAck::handled());
                }
                if let Some(amount) = event.amount
                    && amount != attempt.amount
                {
                    self.ledger
                        .mark_attempt_closed(
                            order_id,
                            LedgerStatus::Failed,
                            Some(AMOUNT_MISMATCH),
                            Some(&format!("webhook reported {amount} but order is {}", attempt.amount)),
                            Some(metadata),
                            now,
                        )
                        .await?;
                    tracing::warn!(
                        order_id = %order_id,
                        reported = amount,
                        expected = attempt.amount,
                        "Webhook rejected: amount mismatch"
                    );
                    return Err(AppError::new(ErrorCode::PaymentAmountMismatch)
                        .with_detail("expected", attempt.amount)
                        .into());
                }

                let Some(payment_key) = event
                    .payment_key
                    .clone()
                    .or_else(|| attempt.payment_key.clone())
                else {
                    // Cannot settle without a payment key; keep the evidence
                    self.ledger.record_webhook(order_id, metadata, now).await?;
                    return Ok(WebhookAck::handled());
                };
                let approval = PaymentApproval {
                    payment_key,
                    method: event.method.clone(),
                    approved_at: parse_approved_at(event.approved_at.as_deref()).unwrap_or(now),
                };
                self.settle(&attempt, &approval, Some(metadata), "webhook")
                    .await?;
            }
            LedgerStatus::Failed | LedgerStatus::Cancelled => {
                let (default_code, payment_status) = if status == LedgerStatus::Failed {
                    ("WEBHOOK_FAILED", PaymentStatus::Failed)
                } else {
                    ("WEBHOOK_CANCELLED", PaymentStatus::Cancelled)
                };
                let code = event.failure_code.as_deref().unwrap_or(default_code);
                if self
                    .ledger
                    .mark_attempt_closed(
                        order_id,
                        status,
                        Some(code),
                        event.failure_message.as_deref(),
                        Some(metadata),
                        now,
                    )
                    .await?
                {
                    self.ledger
                        .set_payment_status(attempt.reservation_id, order_id, payment_status, now)
                        .await?;
                    tracing::info!(order_id = %order_id, status = status.as_db(), "Order closed by webhook");
                }
            }
            LedgerStatus::Ready | LedgerStatus::WebhookReceived => {
                self.ledger.record_webhook(order_id, metadata, now).await?;
            }
        }

        Ok(WebhookAck::handled())
    }
}
