//! Application state for piste-cloud

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::db::{PgStore, Stores};
use crate::error::BoxError;
use crate::gateway::webhook::VerifierChain;
use crate::gateway::{GatewayClient, PaymentGateway};
use crate::notify::Notifier;
use crate::push::{FcmProvider, HintContext, PushDispatcher, PushProvider};
use crate::reconcile::{CheckoutSettings, Reconciler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// HS256 secret of the auth provider's session JWTs
    pub jwt_secret: String,
    /// Store handles (Postgres in production)
    pub stores: Stores,
    /// Checkout / confirm / webhook / fail
    pub reconciler: Arc<Reconciler>,
    /// Webhook trust strategies for the configured secret
    pub webhook_verifiers: Arc<VerifierChain>,
}

/// Everything the engines are wired from
pub struct Components {
    pub stores: Stores,
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub push_provider: Option<Arc<dyn PushProvider>>,
}

impl AppState {
    /// Initialize application state: database, gateway, push provider
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        // 1. PostgreSQL
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database connected, migrations applied");
        let stores = Stores::from_backend(Arc::new(PgStore::new(pool)));

        // 2. Payment gateway (confirm calls need the secret key)
        let gateway: Option<Arc<dyn PaymentGateway>> = match &config.gateway_secret_key {
            Some(secret) => Some(Arc::new(GatewayClient::new(
                &config.gateway_api_base,
                secret,
                config.gateway_timeout,
            )?)),
            None => {
                tracing::warn!("GATEWAY_SECRET_KEY not set: priced checkout is disabled");
                None
            }
        };
        if config.gateway_webhook_secret.is_none() {
            tracing::warn!("GATEWAY_WEBHOOK_SECRET not set: webhooks will be rejected");
        }

        // 3. Push provider
        let push_provider: Option<Arc<dyn PushProvider>> = match config.fcm_service_account()? {
            Some(json) => Some(Arc::new(FcmProvider::from_service_account_json(
                &json,
                config.push_timeout,
            )?)),
            None => {
                tracing::warn!("FCM service account not configured: push delivery is disabled");
                None
            }
        };

        Ok(Self::from_components(
            config,
            Components {
                stores,
                gateway,
                push_provider,
            },
        ))
    }

    /// Wire the engines from already-built components
    pub fn from_components(config: &Config, components: Components) -> Self {
        let Components {
            stores,
            gateway,
            push_provider,
        } = components;

        let push = Arc::new(PushDispatcher::new(
            stores.devices.clone(),
            stores.push_logs.clone(),
            push_provider,
            HintContext {
                app_base_url: config.app_base_url.clone(),
                android_channel_id: config.push_android_channel_id.clone(),
            },
        ));
        let notifier = Arc::new(Notifier::new(stores.notifications.clone(), push));
        let reconciler = Arc::new(Reconciler::new(
            &stores,
            gateway,
            notifier,
            CheckoutSettings {
                client_key: config.gateway_client_key.clone(),
                app_base_url: config.app_base_url.clone(),
            },
        ));

        Self {
            jwt_secret: config.jwt_secret.clone(),
            stores,
            reconciler,
            webhook_verifiers: Arc::new(VerifierChain::for_secret(
                config.gateway_webhook_secret.as_deref(),
            )),
        }
    }
}
