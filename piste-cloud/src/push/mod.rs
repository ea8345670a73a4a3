//! Push Delivery Engine
//!
//! Fans one message out to every active device of a user:
//! dedupe, partition by provider, one multicast, prune dead tokens,
//! one delivery-log row per attempt. Never fails the caller.

pub mod fcm;
pub mod hint;
pub mod provider;

pub use fcm::FcmProvider;
pub use hint::{DeliveryHint, HintContext, normalize_path};
pub use provider::{PushProvider, PushProviderError, PushRequest, PushTarget, TokenOutcome};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use shared::models::{
    DeliveryStatus, DeviceRegistration, NotificationKind, PushDeliveryLog,
};
use shared::util::{now_millis, snowflake_id};

use crate::db::{DeliveryLogStore, DeviceRegistry, StoreResult};

/// What to deliver and to whom
#[derive(Debug, Clone, Default)]
pub struct PushMessage {
    pub user_id: String,
    pub title: String,
    pub body: Option<String>,
    pub path: Option<String>,
    pub dedupe_key: Option<String>,
    pub notification_id: Option<i64>,
    pub kind: Option<NotificationKind>,
    /// Extra data fields; reserved keys (`path`, `notificationId`, `type`) win
    pub extra: BTreeMap<String, String>,
}

/// Result handed back to the caller; informational only
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub ok: bool,
    pub skipped: bool,
    pub sent_count: usize,
    pub failed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl PushOutcome {
    fn skipped(reason: &'static str) -> Self {
        Self {
            ok: true,
            skipped: true,
            sent_count: 0,
            failed_count: 0,
            reason: Some(reason),
        }
    }

    fn failed(reason: &'static str, failed_count: usize) -> Self {
        Self {
            ok: false,
            skipped: false,
            sent_count: 0,
            failed_count,
            reason: Some(reason),
        }
    }

    fn delivered(sent_count: usize, failed_count: usize) -> Self {
        Self {
            ok: sent_count > 0,
            skipped: false,
            sent_count,
            failed_count,
            reason: (sent_count == 0).then_some("all_failed"),
        }
    }
}

pub struct PushDispatcher {
    devices: Arc<dyn DeviceRegistry>,
    logs: Arc<dyn DeliveryLogStore>,
    /// `None` when no provider credentials are configured
    provider: Option<Arc<dyn PushProvider>>,
    hints: HintContext,
}

impl PushDispatcher {
    pub fn new(
        devices: Arc<dyn DeviceRegistry>,
        logs: Arc<dyn DeliveryLogStore>,
        provider: Option<Arc<dyn PushProvider>>,
        hints: HintContext,
    ) -> Self {
        Self {
            devices,
            logs,
            provider,
            hints,
        }
    }

    /// Deliver to every active device of `message.user_id`
    pub async fn send(&self, message: &PushMessage) -> PushOutcome {
        match self.dispatch(message).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(user_id = %message.user_id, error = %e, "Push delivery aborted");
                PushOutcome::failed("store_error", 0)
            }
        }
    }

    async fn dispatch(&self, message: &PushMessage) -> StoreResult<PushOutcome> {
        // 1. Validate
        if message.user_id.trim().is_empty() || message.title.trim().is_empty() {
            return Ok(PushOutcome::skipped("invalid"));
        }
        let dedupe_key = message.dedupe_key.as_deref().filter(|k| !k.is_empty());

        // 2. Dedupe
        if let Some(key) = dedupe_key
            && self.logs.dedupe_key_exists(key).await?
        {
            tracing::debug!(dedupe_key = %key, "Push already attempted, skipping");
            return Ok(PushOutcome::skipped("duplicate"));
        }

        // 3. Active devices
        let devices = self.devices.list_active(&message.user_id).await?;

        // 4. Partition by provider
        let supported = self.provider.as_ref().map(|p| p.kind());
        let (dispatchable, unsupported): (Vec<DeviceRegistration>, Vec<DeviceRegistration>) =
            devices
                .into_iter()
                .partition(|d| Some(d.provider) == supported);
        let mut skipped_providers: BTreeMap<&'static str, usize> = BTreeMap::new();
        for device in &unsupported {
            *skipped_providers.entry(device.provider.as_db()).or_default() += 1;
        }
        if !unsupported.is_empty() {
            tracing::info!(
                user_id = %message.user_id,
                skipped = ?skipped_providers,
                "Devices on unsupported push providers skipped"
            );
        }

        let path = normalize_path(message.path.as_deref());
        let data = self.data_map(message, &path);
        let now = now_millis();

        // 5. Nothing to dispatch
        let provider = match (&self.provider, dispatchable.is_empty()) {
            (Some(provider), false) => provider.clone(),
            _ => {
                let payload = json!({
                    "reason": "no_active_token",
                    "skippedProviders": skipped_providers,
                    "data": data,
                });
                let mut log = self.log_row(message, &path, DeliveryStatus::Skipped, payload, now);
                log.error_message = Some("no_active_token".into());
                if !self.logs.insert_log(&log).await? {
                    return Ok(PushOutcome::skipped("duplicate"));
                }
                return Ok(PushOutcome::skipped("no_active_token"));
            }
        };

        // 6. Claim the dedupe key, then one multicast
        let mut log = self.log_row(
            message,
            &path,
            DeliveryStatus::Queued,
            json!({ "data": data }),
            now,
        );
        log.provider = Some(provider.kind());
        if let [single] = dispatchable.as_slice() {
            log.platform = Some(single.platform);
            log.device_token = Some(single.token.clone());
        }
        if !self.logs.insert_log(&log).await? {
            return Ok(PushOutcome::skipped("duplicate"));
        }

        let request = PushRequest {
            title: message.title.clone(),
            body: message.body.clone(),
            data: data.clone(),
            targets: dispatchable
                .iter()
                .map(|d| PushTarget {
                    token: d.token.clone(),
                    platform: d.platform,
                    hint: DeliveryHint::for_platform(d.platform, &path, &self.hints),
                })
                .collect(),
        };

        let outcomes = match provider.send_multicast(&request).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                tracing::warn!(user_id = %message.user_id, error = %e, "Push provider call failed");
                let payload = json!({
                    "sentCount": 0,
                    "failedCount": request.targets.len(),
                    "providerError": e.to_string(),
                    "skippedProviders": skipped_providers,
                    "data": data,
                });
                self.finalize(log.id, DeliveryStatus::Failed, Some(&e.to_string()), payload, None)
                    .await;
                return Ok(PushOutcome::failed("provider_error", request.targets.len()));
            }
        };

        // 7. Per-token results; prune permanently invalid tokens
        let mut sent_count = 0;
        let mut failure_codes: HashMap<String, usize> = HashMap::new();
        let mut deactivated = Vec::new();
        let mut first_error = None;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(_) => sent_count += 1,
                Err(failure) => {
                    *failure_codes.entry(failure.code.clone()).or_default() += 1;
                    first_error.get_or_insert_with(|| format!("{}: {}", failure.code, failure.message));
                    if failure.is_permanent() {
                        match self.devices.deactivate_token(&outcome.token, now_millis()).await {
                            Ok(true) => deactivated.push(outcome.token.clone()),
                            Ok(false) => tracing::debug!("Dead push token already inactive"),
                            Err(e) => tracing::warn!(error = %e, "Failed to deactivate dead push token"),
                        }
                    } else {
                        tracing::debug!(code = %failure.code, "Transient push failure");
                    }
                }
            }
        }
        let failed_count = outcomes.len() - sent_count;

        // 8. One summary row
        let (status, sent_at) = if sent_count > 0 {
            (DeliveryStatus::Sent, Some(now_millis()))
        } else {
            (DeliveryStatus::Failed, None)
        };
        let payload = json!({
            "sentCount": sent_count,
            "failedCount": failed_count,
            "failureCodes": failure_codes,
            "deactivatedTokens": deactivated,
            "skippedProviders": skipped_providers,
            "data": data,
        });
        let error_message = (sent_count == 0).then_some(first_error).flatten();
        self.finalize(log.id, status, error_message.as_deref(), payload, sent_at)
            .await;

        tracing::info!(
            user_id = %message.user_id,
            sent = sent_count,
            failed = failed_count,
            deactivated = deactivated.len(),
            "Push multicast finished"
        );

        // 9. Report
        Ok(PushOutcome::delivered(sent_count, failed_count))
    }

    fn data_map(&self, message: &PushMessage, path: &str) -> BTreeMap<String, String> {
        let mut data = message.extra.clone();
        data.insert("path".into(), path.to_string());
        if let Some(id) = message.notification_id {
            data.insert("notificationId".into(), id.to_string());
        }
        if let Some(kind) = message.kind {
            data.insert("type".into(), kind.as_db().to_string());
        }
        data
    }

    fn log_row(
        &self,
        message: &PushMessage,
        path: &str,
        status: DeliveryStatus,
        payload: Value,
        now: i64,
    ) -> PushDeliveryLog {
        PushDeliveryLog {
            id: snowflake_id(),
            user_id: message.user_id.clone(),
            provider: None,
            platform: None,
            device_token: None,
            title: message.title.clone(),
            body: message.body.clone(),
            path: path.to_string(),
            dedupe_key: message.dedupe_key.clone().filter(|k| !k.is_empty()),
            status,
            error_message: None,
            payload,
            sent_at: None,
            created_at: now,
        }
    }

    async fn finalize(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
        payload: Value,
        sent_at: Option<i64>,
    ) {
        if let Err(e) = self
            .logs
            .finalize(id, status, error_message, payload, sent_at)
            .await
        {
            tracing::warn!(log_id = id, error = %e, "Failed to finalize push delivery log");
        }
    }
}
