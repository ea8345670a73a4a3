//! Payment Attempt (ledger row) Model

use serde::{Deserialize, Serialize};

/// Reconciliation state of one order id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    /// Checkout prepared, waiting for the gateway
    Ready,
    Paid,
    Failed,
    Cancelled,
    /// Webhook seen with a status that forces no terminal state
    WebhookReceived,
}

impl LedgerStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ready" => Some(Self::Ready),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "webhook_received" => Some(Self::WebhookReceived),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::WebhookReceived => "webhook_received",
        }
    }
}

/// Failure code recorded when a claimed amount differs from the ledger amount
pub const AMOUNT_MISMATCH: &str = "AMOUNT_MISMATCH";

/// One ledger row per order id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub order_id: String,
    pub reservation_id: i64,
    pub user_id: String,
    pub class_id: i64,
    /// Immutable once written
    pub amount: i64,
    pub platform_fee: i64,
    pub status: LedgerStatus,
    pub payment_key: Option<String>,
    pub method: Option<String>,
    pub approved_at: Option<i64>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PaymentAttempt {
    /// Paid with a payment key: no later signal may change this row
    pub fn is_settled(&self) -> bool {
        self.status == LedgerStatus::Paid && self.payment_key.is_some()
    }
}

/// Gateway approval written when an order becomes paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentApproval {
    pub payment_key: String,
    pub method: Option<String>,
    pub approved_at: i64,
}
