//! Cloud server configuration

use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Cloud server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Canonical app origin (checkout success/fail URLs, web-push links)
    pub app_base_url: String,
    /// HS256 secret of the auth provider's session JWTs
    pub jwt_secret: String,
    /// Payment gateway API origin
    pub gateway_api_base: String,
    /// Client key handed to the checkout UI
    pub gateway_client_key: Option<String>,
    /// Server secret for confirm calls
    pub gateway_secret_key: Option<String>,
    /// Shared secret / HMAC key for webhooks
    pub gateway_webhook_secret: Option<String>,
    pub gateway_timeout: Duration,
    /// Service-account JSON content (env: FCM_SERVICE_ACCOUNT_JSON) or file path (env: FCM_SERVICE_ACCOUNT_PATH)
    pub fcm_service_account_json: Option<String>,
    pub fcm_service_account_path: Option<String>,
    pub push_timeout: Duration,
    /// Android notification channel for mobile pushes
    pub push_android_channel_id: String,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn optional(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.trim().is_empty())
    }

    fn seconds(name: &str, default: u64) -> Duration {
        Duration::from_secs(
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(default),
        )
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            app_base_url: std::env::var("APP_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            jwt_secret: Self::require_secret("AUTH_JWT_SECRET", &environment)?,
            gateway_api_base: std::env::var("GATEWAY_API_BASE")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.tosspayments.com".into()),
            gateway_client_key: Self::optional("GATEWAY_CLIENT_KEY"),
            gateway_secret_key: Self::optional("GATEWAY_SECRET_KEY"),
            gateway_webhook_secret: Self::optional("GATEWAY_WEBHOOK_SECRET"),
            gateway_timeout: Self::seconds("GATEWAY_TIMEOUT_SECS", 10),
            fcm_service_account_json: Self::optional("FCM_SERVICE_ACCOUNT_JSON"),
            fcm_service_account_path: Self::optional("FCM_SERVICE_ACCOUNT_PATH"),
            push_timeout: Self::seconds("PUSH_TIMEOUT_SECS", 10),
            push_android_channel_id: Self::optional("PUSH_ANDROID_CHANNEL_ID")
                .unwrap_or_else(|| "default".into()),
        })
    }

    /// Load the push service-account JSON, inline content first
    pub fn fcm_service_account(&self) -> Result<Option<String>, BoxError> {
        if let Some(json) = &self.fcm_service_account_json {
            return Ok(Some(json.clone()));
        }
        match &self.fcm_service_account_path {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_secret_placeholder_in_development() {
        let val = Config::require_secret("PISTE_TEST_UNSET_SECRET", "development").unwrap();
        assert_eq!(val, "dev-PISTE_TEST_UNSET_SECRET-not-for-production");
    }

    #[test]
    fn test_require_secret_missing_in_production() {
        let err = Config::require_secret("PISTE_TEST_UNSET_SECRET", "production").unwrap_err();
        assert!(err.to_string().contains("must be set in production"));
    }
}
