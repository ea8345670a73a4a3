//! In-app notification endpoints: list and read state

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::Notification;
use shared::payment::{OkResponse, UpdatedResponse};

use crate::auth::UserIdentity;
use crate::error::ServiceError;
use crate::state::AppState;

use super::ApiResult;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// GET /api/notifications, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Notification>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = state
        .stores
        .notifications
        .list_for_user(&identity.user_id, limit)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(items))
}

/// PATCH /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<OkResponse> {
    let found = state
        .stores
        .notifications
        .mark_read(&identity.user_id, id)
        .await
        .map_err(ServiceError::from)?;
    if !found {
        return Err(AppError::new(ErrorCode::NotificationNotFound));
    }
    Ok(Json(OkResponse::ok()))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<UpdatedResponse> {
    let updated = state
        .stores
        .notifications
        .mark_all_read(&identity.user_id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(UpdatedResponse { ok: true, updated }))
}
