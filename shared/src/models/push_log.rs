//! Push Delivery Log Model

use super::device::{DevicePlatform, PushProviderKind};
use serde::{Deserialize, Serialize};

/// Outcome recorded for one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Dedupe key claimed, provider call in flight
    Queued,
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One row per push attempt (a multicast is one attempt)
///
/// `device_token` and `platform` are only set when the attempt
/// targeted a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushDeliveryLog {
    pub id: i64,
    pub user_id: String,
    pub provider: Option<PushProviderKind>,
    pub platform: Option<DevicePlatform>,
    pub device_token: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub path: String,
    pub dedupe_key: Option<String>,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
    pub payload: serde_json::Value,
    pub sent_at: Option<i64>,
    pub created_at: i64,
}
