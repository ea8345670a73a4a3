//! Wire types for the checkout / confirm / fail / webhook endpoints
//!
//! Field names are camelCase on the wire.

use crate::models::{DevicePlatform, PushProviderKind};
use serde::{Deserialize, Serialize};

// ============================================================================
// Checkout
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub class_id: i64,
}

/// What the client hands to the gateway's checkout UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    pub amount: i64,
    pub order_id: String,
    pub order_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub success_url: String,
    pub fail_url: String,
    pub gateway_client_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutPayload>,
}

impl CheckoutResponse {
    pub fn free(reservation_id: i64) -> Self {
        Self {
            ok: true,
            free: Some(true),
            already_confirmed: None,
            reservation_id: Some(reservation_id),
            checkout: None,
        }
    }

    pub fn already_confirmed(reservation_id: i64) -> Self {
        Self {
            ok: true,
            free: None,
            already_confirmed: Some(true),
            reservation_id: Some(reservation_id),
            checkout: None,
        }
    }

    pub fn pending(reservation_id: i64, checkout: CheckoutPayload) -> Self {
        Self {
            ok: true,
            free: None,
            already_confirmed: None,
            reservation_id: Some(reservation_id),
            checkout: Some(checkout),
        }
    }
}

// ============================================================================
// Confirm / Fail
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_confirmed: bool,
    pub order_id: String,
    pub redirect_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequest {
    pub order_id: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Bare `{ "ok": true }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// ============================================================================
// Webhook
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
}

impl WebhookAck {
    pub fn handled() -> Self {
        Self {
            ok: true,
            ignored: false,
        }
    }

    pub fn ignored() -> Self {
        Self {
            ok: true,
            ignored: true,
        }
    }
}

// ============================================================================
// Devices / Notifications
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    pub token: String,
    #[serde(default)]
    pub provider: Option<PushProviderKind>,
    pub platform: DevicePlatform,
}

/// Either one `token` or `all: true`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterDeviceRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedResponse {
    pub ok: bool,
    pub updated: u64,
}
