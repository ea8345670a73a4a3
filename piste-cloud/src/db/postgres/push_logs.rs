use async_trait::async_trait;
use shared::models::{DeliveryStatus, PushDeliveryLog};

use super::PgStore;
use crate::db::{DeliveryLogStore, StoreResult};

#[async_trait]
impl DeliveryLogStore for PgStore {
    async fn dedupe_key_exists(&self, dedupe_key: &str) -> StoreResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM push_delivery_logs WHERE dedupe_key = $1 LIMIT 1")
                .bind(dedupe_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn insert_log(&self, log: &PushDeliveryLog) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO push_delivery_logs
                (id, user_id, provider, platform, device_token, title, body, path, dedupe_key,
                 status, error_message, payload, sent_at, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (dedupe_key) WHERE dedupe_key IS NOT NULL DO NOTHING",
        )
        .bind(log.id)
        .bind(&log.user_id)
        .bind(log.provider.map(|p| p.as_db()))
        .bind(log.platform.map(|p| p.as_db()))
        .bind(&log.device_token)
        .bind(&log.title)
        .bind(&log.body)
        .bind(&log.path)
        .bind(&log.dedupe_key)
        .bind(log.status.as_db())
        .bind(&log.error_message)
        .bind(&log.payload)
        .bind(log.sent_at)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn finalize(
        &self,
        id: i64,
        status: DeliveryStatus,
        error_message: Option<&str>,
        payload: serde_json::Value,
        sent_at: Option<i64>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE push_delivery_logs
             SET status = $2, error_message = $3, payload = $4, sent_at = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_db())
        .bind(error_message)
        .bind(payload)
        .bind(sent_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
