//! FCM HTTP v1 provider
//!
//! Service-account OAuth: an RS256 JWT assertion is exchanged at the token
//! URI for an access token, cached until one minute before it expires.
//! A multicast is one concurrent `messages:send` call per token.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shared::models::PushProviderKind;
use shared::util::now_millis;
use tokio::sync::Mutex;

use super::hint::DeliveryHint;
use super::provider::{
    PushProvider, PushProviderError, PushRequest, PushTarget, TokenFailure, TokenOutcome,
};

const FCM_API_BASE: &str = "https://fcm.googleapis.com";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_MS: i64 = 60_000;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Fields used from a Google service-account key file
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

pub struct FcmProvider {
    http: reqwest::Client,
    account: ServiceAccount,
    key: EncodingKey,
    api_base: String,
    token: Mutex<Option<CachedToken>>,
}

impl FcmProvider {
    pub fn from_service_account_json(
        json: &str,
        timeout: Duration,
    ) -> Result<Self, PushProviderError> {
        let account: ServiceAccount = serde_json::from_str(json)
            .map_err(|e| PushProviderError::Config(format!("service account: {e}")))?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| PushProviderError::Config(format!("private key: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PushProviderError::Config(e.to_string()))?;
        Ok(Self {
            http,
            account,
            key,
            api_base: FCM_API_BASE.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Cached access token, refreshed one minute before expiry
    async fn access_token(&self) -> Result<String, PushProviderError> {
        let mut cached = self.token.lock().await;
        let now = now_millis();
        if let Some(token) = cached.as_ref()
            && now + REFRESH_MARGIN_MS < token.expires_at
        {
            return Ok(token.access_token.clone());
        }

        let iat = now / 1000;
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: MESSAGING_SCOPE,
            aud: &self.account.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| PushProviderError::Auth(e.to_string()))?;

        let resp = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PushProviderError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PushProviderError::Auth(format!("token exchange {status}: {body}")));
        }
        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| PushProviderError::Auth(e.to_string()))?;

        tracing::debug!(expires_in = token.expires_in, "FCM access token refreshed");
        let access_token = token.access_token.clone();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in * 1000,
        });
        Ok(access_token)
    }

    async fn send_one(
        &self,
        access_token: &str,
        request: &PushRequest,
        target: &PushTarget,
    ) -> TokenOutcome {
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.api_base, self.account.project_id
        );
        let result = match self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&message_body(request, target))
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                let body: Value = resp.json().await.unwrap_or(Value::Null);
                Ok(body["name"].as_str().unwrap_or_default().to_string())
            }
            Ok(resp) => {
                let status = resp.status();
                let body: Value = resp.json().await.unwrap_or(Value::Null);
                let failure = parse_failure(status.as_u16(), &body);
                tracing::debug!(
                    platform = target.platform.as_db(),
                    code = %failure.code,
                    "FCM send rejected"
                );
                Err(failure)
            }
            Err(e) => Err(TokenFailure {
                code: if e.is_timeout() { "TIMEOUT" } else { "TRANSPORT" }.into(),
                message: e.to_string(),
            }),
        };
        TokenOutcome {
            token: target.token.clone(),
            result,
        }
    }
}

/// v1 message for one target, with its platform hint rendered
fn message_body(request: &PushRequest, target: &PushTarget) -> Value {
    let mut notification = json!({ "title": request.title });
    if let Some(body) = &request.body {
        notification["body"] = json!(body);
    }
    let mut message = json!({
        "token": target.token,
        "notification": notification,
        "data": request.data,
    });
    match &target.hint {
        DeliveryHint::Mobile { sound, channel_id } => {
            message["android"] = json!({
                "priority": "high",
                "notification": { "sound": sound, "channel_id": channel_id },
            });
            message["apns"] = json!({
                "headers": { "apns-priority": "10" },
                "payload": { "aps": { "sound": sound } },
            });
        }
        DeliveryHint::Web { link } => {
            message["webpush"] = json!({ "fcm_options": { "link": link } });
        }
    }
    json!({ "message": message })
}

/// Error code: FCM detail `errorCode`, else the RPC status, else the HTTP status
fn parse_failure(http_status: u16, body: &Value) -> TokenFailure {
    let error = &body["error"];
    let detail_code = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|d| d["errorCode"].as_str());
    let code = detail_code
        .or_else(|| error["status"].as_str())
        .map(String::from)
        .unwrap_or_else(|| format!("HTTP_{http_status}"));
    TokenFailure {
        code,
        message: error["message"].as_str().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    fn kind(&self) -> PushProviderKind {
        PushProviderKind::Fcm
    }

    async fn send_multicast(
        &self,
        request: &PushRequest,
    ) -> Result<Vec<TokenOutcome>, PushProviderError> {
        let access_token = self.access_token().await?;
        let sends = request
            .targets
            .iter()
            .map(|target| self.send_one(&access_token, request, target));
        Ok(join_all(sends).await)
    }
}
