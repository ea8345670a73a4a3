//! Payment gateway REST client (no SDK dependency)
//!
//! POST {api_base}/v1/payments/confirm with HTTP basic auth (secret key, empty password).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ConfirmPayment, ConfirmedPayment, GatewayError, PaymentGateway};

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBody<'a> {
    payment_key: &'a str,
    order_id: &'a str,
    amount: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmSuccess {
    payment_key: String,
    order_id: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    approved_at: Option<String>,
    #[serde(default)]
    total_amount: Option<i64>,
}

#[derive(Deserialize)]
struct GatewayFailure {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GatewayClient {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        })
    }
}

/// Parse an RFC 3339 approval timestamp into Unix millis
pub(crate) fn parse_approved_at(value: Option<&str>) -> Option<i64> {
    value
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp_millis())
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn confirm(&self, request: &ConfirmPayment) -> Result<ConfirmedPayment, GatewayError> {
        let url = format!("{}/v1/payments/confirm", self.api_base);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.secret_key, Some(""))
            .json(&ConfirmBody {
                payment_key: &request.payment_key,
                order_id: &request.order_id,
                amount: request.amount,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let raw: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            let failure: GatewayFailure = serde_json::from_value(raw).unwrap_or(GatewayFailure {
                code: None,
                message: None,
            });
            return Err(GatewayError::Rejected {
                code: failure.code.unwrap_or_else(|| format!("HTTP_{}", status.as_u16())),
                message: failure
                    .message
                    .unwrap_or_else(|| "Payment confirmation was rejected".into()),
            });
        }

        let body: ConfirmSuccess = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        if body.order_id != request.order_id {
            return Err(GatewayError::InvalidResponse(format!(
                "order id {} does not match {}",
                body.order_id, request.order_id
            )));
        }
        if let Some(total) = body.total_amount
            && total != request.amount
        {
            return Err(GatewayError::InvalidResponse(format!(
                "approved amount {total} does not match {}",
                request.amount
            )));
        }

        Ok(ConfirmedPayment {
            payment_key: body.payment_key,
            method: body.method,
            approved_at: parse_approved_at(body.approved_at.as_deref())
                .unwrap_or_else(shared::util::now_millis),
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_approved_at_with_offset() {
        let millis = parse_approved_at(Some("2024-02-13T12:18:14+09:00")).unwrap();
        assert_eq!(millis, 1_707_794_294_000);
        assert!(parse_approved_at(Some("yesterday")).is_none());
        assert!(parse_approved_at(None).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_transport_error() {
        let client =
            GatewayClient::new("http://127.0.0.1:9", "sk_test", Duration::from_secs(2)).unwrap();
        let err = client
            .confirm(&ConfirmPayment {
                payment_key: "pk_1".into(),
                order_id: "rsv-1".into(),
                amount: 100,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert_eq!(err.failure_code(), "GATEWAY_UNREACHABLE");
    }
}
