//! Provider-agnostic push request and per-token results

use std::collections::BTreeMap;

use async_trait::async_trait;
use shared::models::{DevicePlatform, PushProviderKind};

use super::hint::DeliveryHint;

/// Provider error codes meaning the token will never work again
const PERMANENT_CODES: [&str; 3] = [
    "UNREGISTERED",
    "messaging/registration-token-not-registered",
    "messaging/invalid-registration-token",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub token: String,
    pub platform: DevicePlatform,
    pub hint: DeliveryHint,
}

/// One multicast: same title/body/data to every target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub title: String,
    pub body: Option<String>,
    /// String-only data map (includes the normalized `path`)
    pub data: BTreeMap<String, String>,
    pub targets: Vec<PushTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    pub code: String,
    pub message: String,
}

impl TokenFailure {
    /// Permanently invalid token: deactivate the device
    pub fn is_permanent(&self) -> bool {
        PERMANENT_CODES.contains(&self.code.as_str())
            || (self.code == "INVALID_ARGUMENT"
                && self.message.to_ascii_lowercase().contains("registration token"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOutcome {
    pub token: String,
    /// Provider message id on success
    pub result: Result<String, TokenFailure>,
}

/// Whole-call failure; per-token failures are [`TokenOutcome`]s
#[derive(Debug, thiserror::Error)]
pub enum PushProviderError {
    #[error("push provider auth failed: {0}")]
    Auth(String),
    #[error("push provider transport error: {0}")]
    Transport(String),
    #[error("push provider misconfigured: {0}")]
    Config(String),
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Device registrations this provider can deliver to
    fn kind(&self) -> PushProviderKind;

    /// One outcome per target, in any order
    async fn send_multicast(
        &self,
        request: &PushRequest,
    ) -> Result<Vec<TokenOutcome>, PushProviderError>;
}
