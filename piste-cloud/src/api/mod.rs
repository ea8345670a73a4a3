//! API routes for piste-cloud

pub mod devices;
pub mod health;
pub mod notifications;
pub mod payment_webhook;
pub mod payments;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use shared::error::AppError;
use tower_http::trace::TraceLayer;

use crate::auth::user_auth::user_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Signed-in users (session JWT)
    let user = Router::new()
        .route("/api/payments/checkout", post(payments::checkout))
        .route("/api/payments/confirm", post(payments::confirm))
        .route("/api/payments/fail", post(payments::fail))
        .route(
            "/api/devices",
            post(devices::register).delete(devices::unregister),
        )
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/{id}/read",
            patch(notifications::mark_read),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    // Gateway webhook (verified from the raw body, no session)
    let webhook = Router::new().route(
        "/api/payments/webhook",
        post(payment_webhook::handle_webhook),
    );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(user)
        .merge(webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
