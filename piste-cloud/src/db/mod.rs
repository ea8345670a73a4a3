//! Database access layer
//!
//! Every store is an async trait so the engines can run against Postgres in
//! production and against [`memory::MemoryStore`] in tests:
//! ```text
//!            ┌──────────────────────┐
//!            │  LedgerStore, ...    │  ◄── store traits
//!            └──────────┬───────────┘
//!                ┌──────┴──────┐
//!                ▼             ▼
//!             PgStore     MemoryStore
//! ```
//!
//! Guarded transitions return `bool`: `true` when this call performed the
//! transition, `false` when the row was already past it. Callers use that
//! to decide who owns the side effects.

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

use std::sync::Arc;

use async_trait::async_trait;
use shared::models::{
    ClassSubject, DeliveryStatus, DevicePlatform, DeviceRegistration, LedgerStatus, Notification,
    NotificationCreate, PaymentApproval, PaymentAttempt, PaymentStatus, PlatformSettings, Profile,
    PushDeliveryLog, PushProviderKind, ReservationIntent,
};

use crate::error::BoxError;

/// Store-layer error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(BoxError),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// New reservation in `requested`/`pending`
#[derive(Debug, Clone)]
pub struct ReservationCreate {
    pub class_id: i64,
    pub user_id: String,
    pub amount: i64,
    pub now: i64,
}

/// Reservations and their payment attempts (the ledger)
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_reservation(
        &self,
        class_id: i64,
        user_id: &str,
    ) -> StoreResult<Option<ReservationIntent>>;

    async fn get_reservation(&self, id: i64) -> StoreResult<Option<ReservationIntent>>;

    /// Insert unless `(class_id, user_id)` already exists.
    /// Returns the stored row and whether this call created it.
    async fn create_reservation(
        &self,
        new: &ReservationCreate,
    ) -> StoreResult<(ReservationIntent, bool)>;

    /// Point the reservation at a fresh order and put it back to `requested`/`pending`.
    /// Refused once the reservation is confirmed and paid.
    async fn begin_payment(
        &self,
        reservation_id: i64,
        order_id: &str,
        amount: i64,
        now: i64,
    ) -> StoreResult<bool>;

    /// `confirmed`/`paid`. Refused when already confirmed and paid.
    async fn confirm_reservation(&self, reservation_id: i64, confirmed_at: i64)
    -> StoreResult<bool>;

    /// Record a failed/cancelled payment, only while `order_id` is the
    /// reservation's current order and payment is not `paid`.
    async fn set_payment_status(
        &self,
        reservation_id: i64,
        order_id: &str,
        status: PaymentStatus,
        now: i64,
    ) -> StoreResult<bool>;

    /// `Conflict` if the order id already exists
    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> StoreResult<()>;

    async fn find_attempt(&self, order_id: &str) -> StoreResult<Option<PaymentAttempt>>;

    /// `paid` with the gateway approval. Refused once settled.
    async fn mark_attempt_paid(
        &self,
        order_id: &str,
        approval: &PaymentApproval,
        metadata: Option<serde_json::Value>,
        now: i64,
    ) -> StoreResult<bool>;

    /// `failed`/`cancelled` with diagnostics. Never overwrites `paid`.
    async fn mark_attempt_closed(
        &self,
        order_id: &str,
        status: LedgerStatus,
        failure_code: Option<&str>,
        failure_message: Option<&str>,
        metadata: Option<serde_json::Value>,
        now: i64,
    ) -> StoreResult<bool>;

    /// Store webhook metadata; `ready` becomes `webhook_received`, other
    /// states keep their status. Never touches `paid`.
    async fn record_webhook(
        &self,
        order_id: &str,
        metadata: serde_json::Value,
        now: i64,
    ) -> StoreResult<bool>;
}

/// Read side of the class catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_class(&self, class_id: i64) -> StoreResult<Option<ClassSubject>>;
    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// `None` when the dedupe key already produced a row
    async fn create(&self, new: &NotificationCreate, now: i64)
    -> StoreResult<Option<Notification>>;

    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Notification>>;

    async fn mark_read(&self, user_id: &str, notification_id: i64) -> StoreResult<bool>;

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64>;
}

/// Push-capable devices keyed by token
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Insert or rebind by token, always leaving it active
    async fn upsert(
        &self,
        user_id: &str,
        token: &str,
        provider: PushProviderKind,
        platform: DevicePlatform,
        now: i64,
    ) -> StoreResult<DeviceRegistration>;

    async fn deactivate(&self, user_id: &str, token: &str, now: i64) -> StoreResult<bool>;

    async fn deactivate_all(&self, user_id: &str, now: i64) -> StoreResult<u64>;

    /// Provider reported the token as permanently invalid
    async fn deactivate_token(&self, token: &str, now: i64) -> StoreResult<bool>;

    async fn list_active(&self, user_id: &str) -> StoreResult<Vec<DeviceRegistration>>;
}

#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    async fn dedupe_key_exists(&self, dedupe_key: &str) -> StoreResult<bool>;

    /// `false` when the row's dedupe key is already taken
    async fn insert_log(&self, log: &PushDeliveryLog) -> StoreResult<bool>;

    async fn finalize(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
        payload: serde_json::Value,
        sent_at: Option<i64>,
    ) -> StoreResult<()>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Active fee snapshot; zero rates when none is configured
    async fn active_platform_settings(&self) -> StoreResult<PlatformSettings>;
}

/// All store handles the engines and handlers need
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub push_logs: Arc<dyn DeliveryLogStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl Stores {
    /// Use one backend for every store
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: LedgerStore
            + CatalogStore
            + NotificationStore
            + DeviceRegistry
            + DeliveryLogStore
            + SettingsStore
            + 'static,
    {
        Self {
            ledger: backend.clone(),
            catalog: backend.clone(),
            notifications: backend.clone(),
            devices: backend.clone(),
            push_logs: backend.clone(),
            settings: backend,
        }
    }
}
