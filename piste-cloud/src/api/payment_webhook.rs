//! Payment gateway webhook handler
//!
//! POST /api/payments/webhook: raw body, verified before any parsing is trusted

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use shared::error::{AppError, ErrorCode};
use shared::payment::WebhookAck;

use crate::gateway::webhook::WebhookRequest;
use crate::state::AppState;

use super::ApiResult;

/// Handle an incoming gateway webhook
///
/// Must receive the raw body (not JSON) for HMAC verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    // 1. Best-effort parse; the payload-secret verifier needs it
    let payload: Option<serde_json::Value> = serde_json::from_slice(&body).ok();

    // 2. Any verifier in the chain must accept
    let request = WebhookRequest {
        headers: &headers,
        body: &body,
        payload: payload.as_ref(),
    };
    let Some(verifier) = state.webhook_verifiers.verify(&request) else {
        tracing::warn!("Webhook verification failed");
        return Err(AppError::new(ErrorCode::WebhookSignatureInvalid));
    };
    tracing::debug!(verifier, "Webhook verified");

    // 3. Trusted but unreadable
    let payload = payload.ok_or_else(|| {
        tracing::warn!("Webhook body is not JSON");
        AppError::invalid_request("Webhook body must be JSON")
    })?;

    // 4. Reconcile
    let ack = state.reconciler.handle_webhook(&payload).await?;
    Ok(Json(ack))
}
