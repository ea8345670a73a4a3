//! Device registry endpoints: register / unregister push tokens

use axum::{Extension, Json, extract::State};
use shared::error::{AppError, ErrorCode};
use shared::models::{DeviceRegistration, PushProviderKind};
use shared::payment::{RegisterDeviceRequest, UnregisterDeviceRequest, UpdatedResponse};
use shared::util::now_millis;

use crate::auth::UserIdentity;
use crate::error::ServiceError;
use crate::state::AppState;

use super::ApiResult;

const MAX_TOKEN_LEN: usize = 4096;

/// POST /api/devices: upsert by token, rebinding it to the caller
pub async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<RegisterDeviceRequest>,
) -> ApiResult<DeviceRegistration> {
    let token = req.token.trim();
    if token.is_empty() || token.len() > MAX_TOKEN_LEN {
        return Err(AppError::new(ErrorCode::DeviceTokenInvalid));
    }
    let provider = req.provider.unwrap_or(PushProviderKind::Fcm);

    let device = state
        .stores
        .devices
        .upsert(&identity.user_id, token, provider, req.platform, now_millis())
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(
        user_id = %identity.user_id,
        provider = provider.as_db(),
        platform = req.platform.as_db(),
        "Device registered"
    );
    Ok(Json(device))
}

/// DELETE /api/devices: one token, or every device with `all: true`
pub async fn unregister(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<UnregisterDeviceRequest>,
) -> ApiResult<UpdatedResponse> {
    let now = now_millis();
    let updated = if req.all {
        state
            .stores
            .devices
            .deactivate_all(&identity.user_id, now)
            .await
            .map_err(ServiceError::from)?
    } else {
        let token = req
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::validation("token or all is required"))?;
        let changed = state
            .stores
            .devices
            .deactivate(&identity.user_id, token, now)
            .await
            .map_err(ServiceError::from)?;
        u64::from(changed)
    };

    tracing::info!(user_id = %identity.user_id, updated, all = req.all, "Devices deactivated");
    Ok(Json(UpdatedResponse { ok: true, updated }))
}
