//! Notification Fan-out Engine
//!
//! A domain event becomes one persisted notification row, then a push to
//! the recipient's devices under the same dedupe key. The row is the source
//! of truth; push is best effort and never rolls it back.

use std::sync::Arc;

use serde::Serialize;
use shared::models::{NotificationCreate, NotificationKind};
use shared::util::now_millis;

use crate::db::NotificationStore;
use crate::push::{PushDispatcher, PushMessage};

#[derive(Debug, Clone)]
pub struct NotifyRequest {
    pub recipient_id: String,
    pub actor_id: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub deep_link: Option<String>,
    pub dedupe_key: Option<String>,
    /// Deliver even when the actor is the recipient
    pub notify_self: bool,
}

impl NotifyRequest {
    pub fn new(recipient_id: impl Into<String>, kind: NotificationKind, title: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            actor_id: None,
            kind,
            title: title.into(),
            body: None,
            deep_link: None,
            dedupe_key: None,
            notify_self: false,
        }
    }

    pub fn actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn deep_link(mut self, link: impl Into<String>) -> Self {
        self.deep_link = Some(link.into());
        self
    }

    pub fn dedupe_key(mut self, key: impl Into<String>) -> Self {
        self.dedupe_key = Some(key.into());
        self
    }

    pub fn notify_self(mut self) -> Self {
        self.notify_self = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<i64>,
}

impl NotifyResult {
    fn skipped(reason: &'static str) -> Self {
        Self {
            ok: true,
            skipped: Some(reason),
            notification_id: None,
        }
    }
}

pub struct Notifier {
    store: Arc<dyn NotificationStore>,
    push: Arc<PushDispatcher>,
}

impl Notifier {
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<PushDispatcher>) -> Self {
        Self { store, push }
    }

    /// Persist and push. Failures are logged and reported, never raised:
    /// callers treat notification as a side effect.
    pub async fn notify(&self, request: NotifyRequest) -> NotifyResult {
        if !request.notify_self && request.actor_id.as_deref() == Some(request.recipient_id.as_str()) {
            return NotifyResult::skipped("self");
        }

        let new = NotificationCreate {
            recipient_id: request.recipient_id,
            actor_id: request.actor_id,
            kind: request.kind,
            title: request.title,
            body: request.body,
            deep_link: request.deep_link,
            dedupe_key: request.dedupe_key.filter(|k| !k.is_empty()),
        };

        let notification = match self.store.create(&new, now_millis()).await {
            Ok(Some(notification)) => notification,
            Ok(None) => {
                tracing::debug!(
                    recipient_id = %new.recipient_id,
                    dedupe_key = ?new.dedupe_key,
                    "Notification already created for dedupe key"
                );
                return NotifyResult::skipped("duplicate");
            }
            Err(e) => {
                tracing::warn!(
                    recipient_id = %new.recipient_id,
                    kind = new.kind.as_db(),
                    error = %e,
                    "Failed to create notification"
                );
                return NotifyResult {
                    ok: false,
                    skipped: None,
                    notification_id: None,
                };
            }
        };

        let outcome = self
            .push
            .send(&PushMessage {
                user_id: notification.recipient_id.clone(),
                title: notification.title.clone(),
                body: notification.body.clone(),
                path: notification.deep_link.clone(),
                dedupe_key: notification.dedupe_key.clone(),
                notification_id: Some(notification.id),
                kind: Some(notification.kind),
                ..Default::default()
            })
            .await;
        if !outcome.ok {
            tracing::warn!(
                notification_id = notification.id,
                reason = ?outcome.reason,
                failed = outcome.failed_count,
                "Push for notification not delivered"
            );
        }

        NotifyResult {
            ok: true,
            skipped: None,
            notification_id: Some(notification.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::push::tests::{FakeProvider, hints};
    use shared::models::PushProviderKind;

    fn notifier(store: &Arc<MemoryStore>, provider: Arc<FakeProvider>) -> Notifier {
        let push = PushDispatcher::new(store.clone(), store.clone(), Some(provider), hints());
        Notifier::new(store.clone(), Arc::new(push))
    }

    #[tokio::test]
    async fn test_self_action_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());

        let result = notifier(&store, provider.clone())
            .notify(NotifyRequest::new("coach-1", NotificationKind::Reservation, "New booking").actor("coach-1"))
            .await;

        assert_eq!(result.skipped, Some("self"));
        assert!(store.notifications().is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_notify_self_overrides_guard() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());

        let result = notifier(&store, provider)
            .notify(
                NotifyRequest::new("user-1", NotificationKind::Order, "Payment complete")
                    .actor("user-1")
                    .notify_self(),
            )
            .await;

        assert!(result.ok);
        assert!(result.notification_id.is_some());
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_row_then_push_with_same_key() {
        let store = Arc::new(MemoryStore::new());
        store.put_device("coach-1", "tok-1", PushProviderKind::Fcm);
        let provider = Arc::new(FakeProvider::default());

        let result = notifier(&store, provider.clone())
            .notify(
                NotifyRequest::new("coach-1", NotificationKind::Reservation, "New booking")
                    .actor("user-1")
                    .deep_link("/classes/7")
                    .dedupe_key("reservation-requested:1:coach-1"),
            )
            .await;

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(result.notification_id, Some(notifications[0].id));
        let logs = store.push_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].dedupe_key.as_deref(), Some("reservation-requested:1:coach-1"));
        let request = provider.requests.lock().unwrap()[0].clone();
        assert_eq!(request.data["notificationId"], notifications[0].id.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_key_neither_inserts_nor_pushes() {
        let store = Arc::new(MemoryStore::new());
        store.put_device("coach-1", "tok-1", PushProviderKind::Fcm);
        let provider = Arc::new(FakeProvider::default());
        let notifier = notifier(&store, provider.clone());
        let request = NotifyRequest::new("coach-1", NotificationKind::Order, "Paid").dedupe_key("k");

        notifier.notify(request.clone()).await;
        let second = notifier.notify(request).await;

        assert_eq!(second.skipped, Some("duplicate"));
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_notification() {
        let store = Arc::new(MemoryStore::new());
        store.put_device("coach-1", "tok-1", PushProviderKind::Fcm);
        let provider = Arc::new(FakeProvider {
            down: true,
            ..Default::default()
        });

        let result = notifier(&store, provider)
            .notify(NotifyRequest::new("coach-1", NotificationKind::Order, "Paid"))
            .await;

        assert!(result.ok);
        assert_eq!(store.notifications().len(), 1);
    }
}
