//! Session JWT authentication for user-facing routes
//!
//! Sessions are issued by the external auth provider (HS256, shared secret);
//! this service only verifies them.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use shared::error::AppError;

use crate::state::AppState;

/// Claims read from the auth provider's session token
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaims {
    /// User ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
}

/// Authenticated user extracted from the session JWT
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Verify a bearer token against the shared secret
pub fn verify_token(token: &str, secret: &str) -> Result<UserIdentity, AppError> {
    let mut validation = Validation::default();
    // Provider tokens carry an audience we do not pin
    validation.validate_aud = false;

    let token_data = jsonwebtoken::decode::<UserClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid or expired token"),
        }
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::invalid_token("Token has no subject"));
    }

    Ok(UserIdentity {
        user_id: token_data.claims.sub,
        email: token_data.claims.email,
    })
}

/// Middleware that extracts and verifies the session JWT from the Authorization header
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    let identity = verify_token(token, &state.jwt_secret).map_err(IntoResponse::into_response)?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Mint a session token the way the auth provider does (tests only)
#[cfg(test)]
pub fn create_token(user_id: &str, secret: &str, ttl_secs: i64) -> String {
    let claims = UserClaims {
        sub: user_id.to_string(),
        email: Some(format!("{user_id}@example.com")),
        exp: (chrono::Utc::now().timestamp() + ttl_secs) as usize,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_valid_token_yields_identity() {
        let token = create_token("user-1", SECRET, 3600);
        let identity = verify_token(&token, SECRET).unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("user-1@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_token("user-1", "other-secret", 3600);
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = create_token("user-1", SECRET, -3600);
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }
}
