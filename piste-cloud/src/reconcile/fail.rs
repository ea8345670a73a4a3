//! Client-reported gateway failure or cancellation

use shared::models::{LedgerStatus, PaymentStatus};
use shared::payment::{FailRequest, OkResponse};
use shared::util::{now_millis, truncate_chars};

use super::Reconciler;
use crate::error::ServiceResult;

const MAX_CODE_CHARS: usize = 120;
const MAX_MESSAGE_CHARS: usize = 500;
const DEFAULT_FAIL_CODE: &str = "PAYMENT_FAILED";

impl Reconciler {
    /// Idempotent: repeating it re-records the same failure
    pub async fn fail(&self, user_id: &str, req: &FailRequest) -> ServiceResult<OkResponse> {
        let attempt = self.owned_attempt(user_id, &req.order_id).await?;

        let code = req
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| truncate_chars(c, MAX_CODE_CHARS))
            .unwrap_or_else(|| DEFAULT_FAIL_CODE.to_string());
        let message = req
            .message
            .as_deref()
            .map(|m| truncate_chars(m, MAX_MESSAGE_CHARS));

        let now = now_millis();
        if self
            .ledger
            .mark_attempt_closed(
                &attempt.order_id,
                LedgerStatus::Failed,
                Some(&code),
                message.as_deref(),
                None,
                now,
            )
            .await?
        {
            self.ledger
                .set_payment_status(
                    attempt.reservation_id,
                    &attempt.order_id,
                    PaymentStatus::Failed,
                    now,
                )
                .await?;
            tracing::info!(order_id = %attempt.order_id, code = %code, "Payment failure recorded");
        } else {
            tracing::debug!(order_id = %attempt.order_id, "Failure report ignored for paid order");
        }

        Ok(OkResponse::ok())
    }
}
