use async_trait::async_trait;
use shared::models::{DevicePlatform, DeviceRegistration, PushProviderKind};
use shared::util::snowflake_id;

use super::{PgStore, parse_status};
use crate::db::{DeviceRegistry, StoreError, StoreResult};

const COLUMNS: &str = "id, user_id, token, provider, platform, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: i64,
    user_id: String,
    token: String,
    provider: String,
    platform: String,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<DeviceRow> for DeviceRegistration {
    type Error = StoreError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            provider: parse_status("device provider", &row.provider, PushProviderKind::from_db)?,
            platform: parse_status("device platform", &row.platform, DevicePlatform::from_db)?,
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl DeviceRegistry for PgStore {
    async fn upsert(
        &self,
        user_id: &str,
        token: &str,
        provider: PushProviderKind,
        platform: DevicePlatform,
        now: i64,
    ) -> StoreResult<DeviceRegistration> {
        let row: DeviceRow = sqlx::query_as(&format!(
            "INSERT INTO device_registrations
                (id, user_id, token, provider, platform, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $6)
             ON CONFLICT (token) DO UPDATE SET
                user_id = EXCLUDED.user_id, provider = EXCLUDED.provider,
                platform = EXCLUDED.platform, is_active = TRUE, updated_at = EXCLUDED.updated_at
             RETURNING {COLUMNS}"
        ))
        .bind(snowflake_id())
        .bind(user_id)
        .bind(token)
        .bind(provider.as_db())
        .bind(platform.as_db())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn deactivate(&self, user_id: &str, token: &str, now: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE device_registrations SET is_active = FALSE, updated_at = $3
             WHERE user_id = $1 AND token = $2 AND is_active",
        )
        .bind(user_id)
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all(&self, user_id: &str, now: i64) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE device_registrations SET is_active = FALSE, updated_at = $2
             WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn deactivate_token(&self, token: &str, now: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE device_registrations SET is_active = FALSE, updated_at = $2
             WHERE token = $1 AND is_active",
        )
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self, user_id: &str) -> StoreResult<Vec<DeviceRegistration>> {
        let rows: Vec<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM device_registrations
             WHERE user_id = $1 AND is_active
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
