//! Payment endpoints for signed-in users: checkout, confirm, fail

use axum::{Extension, Json, extract::State};
use shared::payment::{
    CheckoutRequest, CheckoutResponse, ConfirmRequest, ConfirmResponse, FailRequest, OkResponse,
};

use crate::auth::UserIdentity;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/payments/checkout
pub async fn checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<CheckoutResponse> {
    let resp = state
        .reconciler
        .checkout(&identity.user_id, req.class_id)
        .await?;
    Ok(Json(resp))
}

/// POST /api/payments/confirm
pub async fn confirm(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ConfirmRequest>,
) -> ApiResult<ConfirmResponse> {
    let resp = state.reconciler.confirm(&identity.user_id, &req).await?;
    Ok(Json(resp))
}

/// POST /api/payments/fail
pub async fn fail(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<FailRequest>,
) -> ApiResult<OkResponse> {
    let resp = state.reconciler.fail(&identity.user_id, &req).await?;
    Ok(Json(resp))
}
