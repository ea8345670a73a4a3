//! Webhook trust and event decoding
//!
//! A webhook is trusted when ANY verifier in the chain accepts it:
//! 1. shared secret in a custom header
//! 2. shared secret in the payload's `secret` field
//! 3. HMAC-SHA256 over the exact raw body (hex or base64)

use axum::http::HeaderMap;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use shared::models::LedgerStatus;

type HmacSha256 = Hmac<Sha256>;

pub const SECRET_HEADER: &str = "x-webhook-secret";
pub const SECRET_FIELD: &str = "secret";
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-webhook-signature", "tosspayments-webhook-signature"];

/// What a verifier gets to look at
pub struct WebhookRequest<'a> {
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
    pub payload: Option<&'a Value>,
}

/// One independent trust strategy
pub trait WebhookVerifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn verify(&self, request: &WebhookRequest<'_>) -> bool;
}

/// Byte comparison without early exit
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub struct SecretHeader {
    secret: String,
}

impl WebhookVerifier for SecretHeader {
    fn name(&self) -> &'static str {
        "secret_header"
    }

    fn verify(&self, request: &WebhookRequest<'_>) -> bool {
        request
            .headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| constant_time_eq(v.trim().as_bytes(), self.secret.as_bytes()))
    }
}

pub struct PayloadSecret {
    secret: String,
}

impl WebhookVerifier for PayloadSecret {
    fn name(&self) -> &'static str {
        "payload_secret"
    }

    fn verify(&self, request: &WebhookRequest<'_>) -> bool {
        request
            .payload
            .and_then(|p| p.get(SECRET_FIELD))
            .and_then(Value::as_str)
            .is_some_and(|v| constant_time_eq(v.as_bytes(), self.secret.as_bytes()))
    }
}

pub struct HmacSignature {
    secret: String,
}

impl HmacSignature {
    /// Decode one signature candidate: optional `sha256=`/`v1=` prefix, hex first, then base64
    fn decode(candidate: &str) -> Option<Vec<u8>> {
        let sig = candidate.trim();
        let sig = sig
            .strip_prefix("sha256=")
            .or_else(|| sig.strip_prefix("v1="))
            .unwrap_or(sig);
        hex::decode(sig)
            .ok()
            .or_else(|| base64::engine::general_purpose::STANDARD.decode(sig).ok())
    }

    fn matches(&self, body: &[u8], signature: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        mac.update(body);
        // verify_slice is constant-time
        mac.verify_slice(signature).is_ok()
    }
}

impl WebhookVerifier for HmacSignature {
    fn name(&self) -> &'static str {
        "hmac_signature"
    }

    fn verify(&self, request: &WebhookRequest<'_>) -> bool {
        SIGNATURE_HEADERS
            .iter()
            .filter_map(|name| request.headers.get(*name))
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(Self::decode)
            .any(|sig| self.matches(request.body, &sig))
    }
}

/// Ordered verifier list; empty chain rejects everything
#[derive(Default)]
pub struct VerifierChain {
    verifiers: Vec<Box<dyn WebhookVerifier>>,
}

impl VerifierChain {
    /// Standard chain for one configured webhook secret
    pub fn for_secret(secret: Option<&str>) -> Self {
        let Some(secret) = secret.filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        Self::default()
            .with(SecretHeader {
                secret: secret.to_string(),
            })
            .with(PayloadSecret {
                secret: secret.to_string(),
            })
            .with(HmacSignature {
                secret: secret.to_string(),
            })
    }

    pub fn with(mut self, verifier: impl WebhookVerifier + 'static) -> Self {
        self.verifiers.push(Box::new(verifier));
        self
    }

    /// Name of the first verifier that accepts the request
    pub fn verify(&self, request: &WebhookRequest<'_>) -> Option<&'static str> {
        self.verifiers
            .iter()
            .find(|v| v.verify(request))
            .map(|v| v.name())
    }
}

/// Normalize the provider's status / event vocabulary
///
/// Unknown terms map to `WebhookReceived`, never an error.
pub fn map_status(status: Option<&str>, event_type: Option<&str>) -> LedgerStatus {
    // Word match, so "UNPAID" never reads as "PAID"
    let terms: Vec<String> = [status, event_type]
        .into_iter()
        .flatten()
        .flat_map(|s| s.split(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_uppercase())
        .collect();
    let has = |needle: &str| terms.iter().any(|t| t == needle);

    if has("DONE") || has("PAID") {
        LedgerStatus::Paid
    } else if has("CANCELED") || has("CANCELLED") {
        LedgerStatus::Cancelled
    } else if has("ABORTED") || has("FAILED") {
        LedgerStatus::Failed
    } else {
        LedgerStatus::WebhookReceived
    }
}

/// Fields the reconciliation needs, read from `data.*` or the top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub order_id: Option<String>,
    pub status: Option<String>,
    pub event_type: Option<String>,
    pub payment_key: Option<String>,
    pub amount: Option<i64>,
    pub method: Option<String>,
    pub approved_at: Option<String>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
}

impl WebhookEvent {
    pub fn from_payload(payload: &Value) -> Self {
        let data = payload.get("data").filter(|d| d.is_object());
        let field = |name: &str| -> Option<&Value> {
            data.and_then(|d| d.get(name))
                .filter(|v| !v.is_null())
                .or_else(|| payload.get(name).filter(|v| !v.is_null()))
        };
        let text = |name: &str| field(name).and_then(Value::as_str).map(String::from);
        let failure = field("failure");

        Self {
            order_id: text("orderId"),
            status: text("status"),
            event_type: payload
                .get("eventType")
                .and_then(Value::as_str)
                .map(String::from),
            payment_key: text("paymentKey"),
            amount: field("totalAmount")
                .or_else(|| field("amount"))
                .and_then(Value::as_i64),
            method: text("method"),
            approved_at: text("approvedAt"),
            failure_code: failure
                .and_then(|f| f.get("code"))
                .and_then(Value::as_str)
                .map(String::from),
            failure_message: failure
                .and_then(|f| f.get("message"))
                .and_then(Value::as_str)
                .map(String::from),
        }
    }

    pub fn mapped_status(&self) -> LedgerStatus {
        map_status(self.status.as_deref(), self.event_type.as_deref())
    }
}
