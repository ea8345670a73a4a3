//! In-process store for engine and router tests
//!
//! Mirrors the guarded-update semantics of the Postgres queries.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared::models::{
    ClassSubject, DeliveryStatus, DevicePlatform, DeviceRegistration, LedgerStatus,
    LifecycleStatus, Notification, NotificationCreate, PaymentApproval, PaymentAttempt,
    PaymentStatus, PlatformSettings, Profile, PushDeliveryLog, PushProviderKind,
    ReservationIntent,
};
use shared::util::snowflake_id;

use super::{
    CatalogStore, DeliveryLogStore, DeviceRegistry, LedgerStore, NotificationStore,
    ReservationCreate, SettingsStore, StoreError, StoreResult,
};

#[derive(Default)]
struct MemoryState {
    classes: HashMap<i64, ClassSubject>,
    profiles: HashMap<String, Profile>,
    reservations: HashMap<i64, ReservationIntent>,
    attempts: HashMap<String, PaymentAttempt>,
    notifications: Vec<Notification>,
    devices: HashMap<String, DeviceRegistration>,
    push_logs: Vec<PushDeliveryLog>,
    settings: PlatformSettings,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Next `confirm_reservation` fails like a dropped connection
    fail_next_confirm: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    // ========== Seeding / inspection ==========

    pub fn fail_next_confirm(&self) {
        self.fail_next_confirm.store(true, Ordering::SeqCst);
    }

    pub fn put_class(&self, class: ClassSubject) {
        self.with(|s| s.classes.insert(class.id, class));
    }

    pub fn put_profile(&self, profile: Profile) {
        self.with(|s| s.profiles.insert(profile.id.clone(), profile));
    }

    pub fn put_settings(&self, settings: PlatformSettings) {
        self.with(|s| s.settings = settings);
    }

    pub fn put_device(&self, user_id: &str, token: &str, provider: PushProviderKind) {
        self.with(|s| {
            s.devices.insert(
                token.to_string(),
                DeviceRegistration {
                    id: snowflake_id(),
                    user_id: user_id.to_string(),
                    token: token.to_string(),
                    provider,
                    platform: DevicePlatform::Android,
                    is_active: true,
                    created_at: 0,
                    updated_at: 0,
                },
            )
        });
    }

    pub fn device(&self, token: &str) -> Option<DeviceRegistration> {
        self.with(|s| s.devices.get(token).cloned())
    }

    pub fn attempt(&self, order_id: &str) -> Option<PaymentAttempt> {
        self.with(|s| s.attempts.get(order_id).cloned())
    }

    pub fn reservation(&self, id: i64) -> Option<ReservationIntent> {
        self.with(|s| s.reservations.get(&id).cloned())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.with(|s| s.notifications.clone())
    }

    pub fn push_logs(&self) -> Vec<PushDeliveryLog> {
        self.with(|s| s.push_logs.clone())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_reservation(
        &self,
        class_id: i64,
        user_id: &str,
    ) -> StoreResult<Option<ReservationIntent>> {
        Ok(self.with(|s| {
            s.reservations
                .values()
                .find(|r| r.class_id == class_id && r.user_id == user_id)
                .cloned()
        }))
    }

    async fn get_reservation(&self, id: i64) -> StoreResult<Option<ReservationIntent>> {
        Ok(self.reservation(id))
    }

    async fn create_reservation(
        &self,
        new: &ReservationCreate,
    ) -> StoreResult<(ReservationIntent, bool)> {
        Ok(self.with(|s| {
            if let Some(existing) = s
                .reservations
                .values()
                .find(|r| r.class_id == new.class_id && r.user_id == new.user_id)
            {
                return (existing.clone(), false);
            }
            let reservation = ReservationIntent {
                id: snowflake_id(),
                class_id: new.class_id,
                user_id: new.user_id.clone(),
                status: LifecycleStatus::Requested,
                payment_status: PaymentStatus::Pending,
                amount: new.amount,
                order_id: None,
                confirmed_at: None,
                created_at: new.now,
                updated_at: new.now,
            };
            s.reservations.insert(reservation.id, reservation.clone());
            (reservation, true)
        }))
    }

    async fn begin_payment(
        &self,
        reservation_id: i64,
        order_id: &str,
        amount: i64,
        now: i64,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| match s.reservations.get_mut(&reservation_id) {
            Some(r) if !r.is_settled() => {
                r.status = LifecycleStatus::Requested;
                r.payment_status = PaymentStatus::Pending;
                r.order_id = Some(order_id.to_string());
                r.amount = amount;
                r.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn confirm_reservation(
        &self,
        reservation_id: i64,
        confirmed_at: i64,
    ) -> StoreResult<bool> {
        if self.fail_next_confirm.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database("connection reset".into()));
        }
        Ok(self.with(|s| match s.reservations.get_mut(&reservation_id) {
            Some(r) if !r.is_settled() => {
                r.status = LifecycleStatus::Confirmed;
                r.payment_status = PaymentStatus::Paid;
                r.confirmed_at = Some(confirmed_at);
                r.updated_at = confirmed_at;
                true
            }
            _ => false,
        }))
    }

    async fn set_payment_status(
        &self,
        reservation_id: i64,
        order_id: &str,
        status: PaymentStatus,
        now: i64,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| match s.reservations.get_mut(&reservation_id) {
            Some(r)
                if r.order_id.as_deref() == Some(order_id)
                    && r.payment_status != PaymentStatus::Paid =>
            {
                r.payment_status = status;
                r.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> StoreResult<()> {
        self.with(|s| {
            if s.attempts.contains_key(&attempt.order_id) {
                return Err(StoreError::Conflict(format!(
                    "order {} already exists",
                    attempt.order_id
                )));
            }
            s.attempts
                .insert(attempt.order_id.clone(), attempt.clone());
            Ok(())
        })
    }

    async fn find_attempt(&self, order_id: &str) -> StoreResult<Option<PaymentAttempt>> {
        Ok(self.attempt(order_id))
    }

    async fn mark_attempt_paid(
        &self,
        order_id: &str,
        approval: &PaymentApproval,
        metadata: Option<serde_json::Value>,
        now: i64,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| match s.attempts.get_mut(order_id) {
            Some(a) if !a.is_settled() => {
                a.status = LedgerStatus::Paid;
                a.payment_key = Some(approval.payment_key.clone());
                a.method = approval.method.clone();
                a.approved_at = Some(approval.approved_at);
                a.failure_code = None;
                a.failure_message = None;
                if metadata.is_some() {
                    a.metadata = metadata;
                }
                a.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn mark_attempt_closed(
        &self,
        order_id: &str,
        status: LedgerStatus,
        failure_code: Option<&str>,
        failure_message: Option<&str>,
        metadata: Option<serde_json::Value>,
        now: i64,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| match s.attempts.get_mut(order_id) {
            Some(a) if a.status != LedgerStatus::Paid => {
                a.status = status;
                a.failure_code = failure_code.map(String::from);
                a.failure_message = failure_message.map(String::from);
                if metadata.is_some() {
                    a.metadata = metadata;
                }
                a.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn record_webhook(
        &self,
        order_id: &str,
        metadata: serde_json::Value,
        now: i64,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| match s.attempts.get_mut(order_id) {
            Some(a) if a.status != LedgerStatus::Paid => {
                if a.status == LedgerStatus::Ready {
                    a.status = LedgerStatus::WebhookReceived;
                }
                a.metadata = Some(metadata);
                a.updated_at = now;
                true
            }
            _ => false,
        }))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_class(&self, class_id: i64) -> StoreResult<Option<ClassSubject>> {
        Ok(self.with(|s| s.classes.get(&class_id).cloned()))
    }

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        Ok(self.with(|s| s.profiles.get(user_id).cloned()))
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn create(
        &self,
        new: &NotificationCreate,
        now: i64,
    ) -> StoreResult<Option<Notification>> {
        Ok(self.with(|s| {
            if let Some(key) = &new.dedupe_key
                && s.notifications
                    .iter()
                    .any(|n| n.dedupe_key.as_ref() == Some(key))
            {
                return None;
            }
            let notification = Notification {
                id: snowflake_id(),
                recipient_id: new.recipient_id.clone(),
                actor_id: new.actor_id.clone(),
                kind: new.kind,
                title: new.title.clone(),
                body: new.body.clone(),
                deep_link: new.deep_link.clone(),
                dedupe_key: new.dedupe_key.clone(),
                is_read: false,
                created_at: now,
            };
            s.notifications.push(notification.clone());
            Some(notification)
        }))
    }

    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Notification>> {
        Ok(self.with(|s| {
            let mut items: Vec<_> = s
                .notifications
                .iter()
                .filter(|n| n.recipient_id == user_id)
                .cloned()
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            items.truncate(limit.max(0) as usize);
            items
        }))
    }

    async fn mark_read(&self, user_id: &str, notification_id: i64) -> StoreResult<bool> {
        Ok(self.with(|s| {
            match s
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id && n.recipient_id == user_id)
            {
                Some(n) => {
                    n.is_read = true;
                    true
                }
                None => false,
            }
        }))
    }

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64> {
        Ok(self.with(|s| {
            let mut updated = 0;
            for n in s
                .notifications
                .iter_mut()
                .filter(|n| n.recipient_id == user_id && !n.is_read)
            {
                n.is_read = true;
                updated += 1;
            }
            updated
        }))
    }
}

#[async_trait]
impl DeviceRegistry for MemoryStore {
    async fn upsert(
        &self,
        user_id: &str,
        token: &str,
        provider: PushProviderKind,
        platform: DevicePlatform,
        now: i64,
    ) -> StoreResult<DeviceRegistration> {
        Ok(self.with(|s| {
            let device = s
                .devices
                .entry(token.to_string())
                .or_insert_with(|| DeviceRegistration {
                    id: snowflake_id(),
                    user_id: user_id.to_string(),
                    token: token.to_string(),
                    provider,
                    platform,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                });
            device.user_id = user_id.to_string();
            device.provider = provider;
            device.platform = platform;
            device.is_active = true;
            device.updated_at = now;
            device.clone()
        }))
    }

    async fn deactivate(&self, user_id: &str, token: &str, now: i64) -> StoreResult<bool> {
        Ok(self.with(|s| match s.devices.get_mut(token) {
            Some(d) if d.user_id == user_id && d.is_active => {
                d.is_active = false;
                d.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn deactivate_all(&self, user_id: &str, now: i64) -> StoreResult<u64> {
        Ok(self.with(|s| {
            let mut updated = 0;
            for d in s
                .devices
                .values_mut()
                .filter(|d| d.user_id == user_id && d.is_active)
            {
                d.is_active = false;
                d.updated_at = now;
                updated += 1;
            }
            updated
        }))
    }

    async fn deactivate_token(&self, token: &str, now: i64) -> StoreResult<bool> {
        Ok(self.with(|s| match s.devices.get_mut(token) {
            Some(d) if d.is_active => {
                d.is_active = false;
                d.updated_at = now;
                true
            }
            _ => false,
        }))
    }

    async fn list_active(&self, user_id: &str) -> StoreResult<Vec<DeviceRegistration>> {
        Ok(self.with(|s| {
            let mut devices: Vec<_> = s
                .devices
                .values()
                .filter(|d| d.user_id == user_id && d.is_active)
                .cloned()
                .collect();
            devices.sort_by(|a, b| a.token.cmp(&b.token));
            devices
        }))
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryStore {
    async fn dedupe_key_exists(&self, dedupe_key: &str) -> StoreResult<bool> {
        Ok(self.with(|s| {
            s.push_logs
                .iter()
                .any(|l| l.dedupe_key.as_deref() == Some(dedupe_key))
        }))
    }

    async fn insert_log(&self, log: &PushDeliveryLog) -> StoreResult<bool> {
        Ok(self.with(|s| {
            if let Some(key) = &log.dedupe_key
                && s.push_logs
                    .iter()
                    .any(|l| l.dedupe_key.as_ref() == Some(key))
            {
                return false;
            }
            s.push_logs.push(log.clone());
            true
        }))
    }

    async fn finalize(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
        payload: serde_json::Value,
        sent_at: Option<i64>,
    ) -> StoreResult<()> {
        self.with(|s| match s.push_logs.iter_mut().find(|l| l.id == id) {
            Some(log) => {
                log.status = status;
                log.error_message = error_message.map(String::from);
                log.payload = payload;
                log.sent_at = sent_at;
                Ok(())
            }
            None => Err(StoreError::NotFound("Push delivery log")),
        })
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn active_platform_settings(&self) -> StoreResult<PlatformSettings> {
        Ok(self.with(|s| s.settings))
    }
}
