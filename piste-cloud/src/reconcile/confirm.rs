//! Client-driven confirm after the gateway redirect

use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{AMOUNT_MISMATCH, LedgerStatus, PaymentApproval, PaymentAttempt, PaymentStatus};
use shared::payment::{ConfirmRequest, ConfirmResponse};
use shared::util::now_millis;

use super::{Reconciler, redirect_path};
use crate::error::ServiceResult;
use crate::gateway::ConfirmPayment;

impl Reconciler {
    /// Ledger row owned by `user_id`: 404 when missing, 403 when foreign
    pub(super) async fn owned_attempt(
        &self,
        user_id: &str,
        order_id: &str,
    ) -> ServiceResult<PaymentAttempt> {
        let attempt = self
            .ledger
            .find_attempt(order_id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;
        if attempt.user_id != user_id {
            tracing::warn!(order_id = %order_id, user_id = %user_id, "Order belongs to another user");
            return Err(AppError::not_owner().into());
        }
        Ok(attempt)
    }

    pub async fn confirm(&self, user_id: &str, req: &ConfirmRequest) -> ServiceResult<ConfirmResponse> {
        if req.payment_key.trim().is_empty() || req.order_id.trim().is_empty() {
            return Err(AppError::validation("paymentKey and orderId are required").into());
        }

        // 1-2. Existing order of this user
        let attempt = self.owned_attempt(user_id, &req.order_id).await?;
        let response = |already_confirmed| ConfirmResponse {
            ok: true,
            already_confirmed,
            order_id: attempt.order_id.clone(),
            redirect_path: redirect_path(attempt.class_id),
        };

        // 3. Replays never reach the gateway
        if attempt.is_settled() {
            self.resume_settled(&attempt, "confirm").await?;
            return Ok(response(true));
        }

        // 4. Claimed amount must match the ledger
        if req.amount != attempt.amount {
            let message = format!("claimed {} but order is {}", req.amount, attempt.amount);
            self.ledger
                .mark_attempt_closed(
                    &attempt.order_id,
                    LedgerStatus::Failed,
                    Some(AMOUNT_MISMATCH),
                    Some(&message),
                    None,
                    now_millis(),
                )
                .await?;
            tracing::warn!(
                order_id = %attempt.order_id,
                claimed = req.amount,
                expected = attempt.amount,
                "Confirm rejected: amount mismatch"
            );
            return Err(AppError::new(ErrorCode::PaymentAmountMismatch)
                .with_detail("expected", attempt.amount)
                .into());
        }

        // 5. Gateway confirm with the ledger amount
        let gateway = self.gateway.as_ref().ok_or_else(|| {
            tracing::error!(order_id = %attempt.order_id, "Payment gateway secret is not configured");
            AppError::with_message(ErrorCode::PaymentSetupFailed, "Payment gateway is not configured")
        })?;
        let confirmed = match gateway
            .confirm(&ConfirmPayment {
                payment_key: req.payment_key.clone(),
                order_id: attempt.order_id.clone(),
                amount: attempt.amount,
            })
            .await
        {
            Ok(confirmed) => confirmed,
            Err(e) => {
                let now = now_millis();
                self.ledger
                    .mark_attempt_closed(
                        &attempt.order_id,
                        LedgerStatus::Failed,
                        Some(e.failure_code()),
                        Some(&e.failure_message()),
                        None,
                        now,
                    )
                    .await?;
                self.ledger
                    .set_payment_status(
                        attempt.reservation_id,
                        &attempt.order_id,
                        PaymentStatus::Failed,
                        now,
                    )
                    .await?;
                tracing::warn!(
                    order_id = %attempt.order_id,
                    code = e.failure_code(),
                    error = %e,
                    "Gateway confirm failed"
                );

                // A webhook may have settled the order while we waited
                if self
                    .ledger
                    .find_attempt(&attempt.order_id)
                    .await?
                    .is_some_and(|a| a.is_settled())
                {
                    return Ok(response(true));
                }
                return Err(AppError::from(&e).into());
            }
        };

        // 6. Settle; losing the race means a webhook got there first
        let approval = PaymentApproval {
            payment_key: confirmed.payment_key,
            method: confirmed.method,
            approved_at: confirmed.approved_at,
        };
        let won = self
            .settle(&attempt, &approval, Some(json!({ "confirm": confirmed.raw })), "confirm")
            .await?;
        Ok(response(!won))
    }
}
