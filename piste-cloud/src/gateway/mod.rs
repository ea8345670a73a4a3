//! Payment gateway integration
//!
//! - [`PaymentGateway`]: synchronous confirm call, implemented by [`GatewayClient`]
//! - [`webhook`]: verifier strategies, status mapping and event field extraction

pub mod client;
pub mod webhook;

pub use client::GatewayClient;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};

/// Confirm call input. The amount is always the ledger amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPayment {
    pub payment_key: String,
    pub order_id: String,
    pub amount: i64,
}

/// Approved payment returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedPayment {
    pub payment_key: String,
    pub method: Option<String>,
    pub approved_at: i64,
    pub raw: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The gateway answered and refused the payment
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },
    /// The gateway could not be reached (includes timeouts)
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Failure code recorded on the ledger row
    pub fn failure_code(&self) -> &str {
        match self {
            Self::Rejected { code, .. } => code,
            Self::Transport(_) => "GATEWAY_UNREACHABLE",
            Self::InvalidResponse(_) => "GATEWAY_INVALID_RESPONSE",
        }
    }

    /// Message recorded on the ledger row and shown to the user
    pub fn failure_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<&GatewayError> for AppError {
    fn from(e: &GatewayError) -> Self {
        match e {
            GatewayError::Rejected { code, message } => {
                AppError::payment_failed(message.clone()).with_detail("gateway_code", code.clone())
            }
            GatewayError::Transport(_) | GatewayError::InvalidResponse(_) => {
                AppError::new(ErrorCode::PaymentGatewayError)
            }
        }
    }
}

/// External payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn confirm(&self, request: &ConfirmPayment) -> Result<ConfirmedPayment, GatewayError>;
}
