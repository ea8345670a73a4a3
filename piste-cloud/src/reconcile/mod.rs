//! Reconciliation Engine
//!
//! Owns a priced reservation from checkout to its terminal payment outcome.
//! Three unordered, at-least-once signals drive an order:
//!
//! ```text
//!   confirm (client) ──┐
//!   webhook (gateway) ─┼──► guarded ledger transition ──► reservation ──► notify
//!   fail    (client) ──┘
//! ```
//!
//! No locks: every mutation is a guarded write that reports whether it
//! happened, `paid` is sticky, and notifications carry deterministic
//! dedupe keys. Every signal that sees a paid order re-applies the
//! reservation update and notifications, so an interrupted settlement
//! converges on the next delivery. Only the first one reports a fresh
//! confirmation; the others observe "already confirmed".

mod checkout;
mod confirm;
mod fail;
mod webhook;


use std::sync::Arc;

use serde_json::Value;
use shared::models::{NotificationKind, PaymentApproval, PaymentAttempt};
use shared::util::now_millis;

use crate::db::{CatalogStore, LedgerStore, SettingsStore, Stores};
use crate::error::ServiceResult;
use crate::gateway::PaymentGateway;
use crate::notify::{Notifier, NotifyRequest};

/// Gateway values handed to the checkout UI
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub client_key: Option<String>,
    /// Origin of success/fail redirect URLs
    pub app_base_url: String,
}

pub struct Reconciler {
    ledger: Arc<dyn LedgerStore>,
    catalog: Arc<dyn CatalogStore>,
    settings: Arc<dyn SettingsStore>,
    /// `None` when the gateway secret key is not configured
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifier: Arc<Notifier>,
    checkout: CheckoutSettings,
}

impl Reconciler {
    pub fn new(
        stores: &Stores,
        gateway: Option<Arc<dyn PaymentGateway>>,
        notifier: Arc<Notifier>,
        checkout: CheckoutSettings,
    ) -> Self {
        Self {
            ledger: stores.ledger.clone(),
            catalog: stores.catalog.clone(),
            settings: stores.settings.clone(),
            gateway,
            notifier,
            checkout,
        }
    }

    /// Mark the order paid and confirm its reservation.
    ///
    /// Returns `true` when this call won the `paid` transition, `false` when
    /// another signal already settled the order. Either way the reservation
    /// and notifications are brought in line with the paid ledger row.
    async fn settle(
        &self,
        attempt: &PaymentAttempt,
        approval: &PaymentApproval,
        metadata: Option<Value>,
        source: &'static str,
    ) -> ServiceResult<bool> {
        let won = self
            .ledger
            .mark_attempt_paid(&attempt.order_id, approval, metadata, now_millis())
            .await?;
        if !won {
            tracing::debug!(order_id = %attempt.order_id, source, "Order already settled");
        }

        self.apply_paid(attempt, approval.approved_at, source).await?;
        Ok(won)
    }

    /// Side effects of a paid order. Safe to replay: the reservation update
    /// is guarded and every notification carries a per-recipient dedupe key.
    async fn apply_paid(
        &self,
        attempt: &PaymentAttempt,
        approved_at: i64,
        source: &'static str,
    ) -> ServiceResult<()> {
        let order_id = attempt.order_id.as_str();
        let confirmed = self
            .ledger
            .confirm_reservation(attempt.reservation_id, approved_at)
            .await?;
        if confirmed {
            tracing::info!(
                order_id = %order_id,
                reservation_id = attempt.reservation_id,
                amount = attempt.amount,
                source,
                "Payment settled, reservation confirmed"
            );
        } else {
            let current = self
                .ledger
                .get_reservation(attempt.reservation_id)
                .await?
                .and_then(|r| r.order_id);
            if current.as_deref() != Some(order_id) {
                tracing::warn!(
                    order_id = %order_id,
                    reservation_id = attempt.reservation_id,
                    current_order = ?current,
                    source,
                    "Order paid but reservation was already settled by another order"
                );
            }
        }

        self.notify_paid(attempt).await;
        Ok(())
    }

    /// Replay of a settled order: re-apply its side effects
    async fn resume_settled(
        &self,
        attempt: &PaymentAttempt,
        source: &'static str,
    ) -> ServiceResult<()> {
        let approved_at = attempt.approved_at.unwrap_or(attempt.updated_at);
        self.apply_paid(attempt, approved_at, source).await
    }

    /// Coach and payer, one dedupe key per (order, recipient)
    async fn notify_paid(&self, attempt: &PaymentAttempt) {
        let order_id = &attempt.order_id;
        let path = redirect_path(attempt.class_id);
        let class = match self.catalog.find_class(attempt.class_id).await {
            Ok(class) => class,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Class lookup failed, notifying payer only");
                None
            }
        };
        let title = class
            .as_ref()
            .map(|c| c.title.clone())
            .unwrap_or_else(|| "your class".to_string());

        if let Some(class) = &class {
            self.notifier
                .notify(
                    NotifyRequest::new(&class.coach_id, NotificationKind::Order, "New paid reservation")
                        .actor(&attempt.user_id)
                        .body(format!("A reservation for {title} has been paid."))
                        .deep_link(&path)
                        .dedupe_key(format!("payment-confirmed:{order_id}:{}", class.coach_id)),
                )
                .await;
        }

        self.notifier
            .notify(
                NotifyRequest::new(&attempt.user_id, NotificationKind::Order, "Payment complete")
                    .actor(&attempt.user_id)
                    .notify_self()
                    .body(format!("Your reservation for {title} is confirmed."))
                    .deep_link(&path)
                    .dedupe_key(format!("payment-confirmed:{order_id}:{}", attempt.user_id)),
            )
            .await;
    }
}

/// Where the client lands after a payment
pub(crate) fn redirect_path(class_id: i64) -> String {
    format!("/classes/{class_id}")
}
