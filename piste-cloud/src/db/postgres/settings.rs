use async_trait::async_trait;
use shared::models::PlatformSettings;

use super::PgStore;
use crate::db::{SettingsStore, StoreResult};

#[async_trait]
impl SettingsStore for PgStore {
    async fn active_platform_settings(&self) -> StoreResult<PlatformSettings> {
        let settings = sqlx::query_as::<_, PlatformSettings>(
            "SELECT class_fee_rate_bps, marketplace_fee_rate_bps
             FROM platform_settings
             WHERE is_active
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(settings.unwrap_or_default())
    }
}
