use async_trait::async_trait;
use shared::models::{Notification, NotificationCreate, NotificationKind};
use shared::util::snowflake_id;

use super::{PgStore, parse_status};
use crate::db::{NotificationStore, StoreError, StoreResult};

const COLUMNS: &str =
    "id, recipient_id, actor_id, kind, title, body, deep_link, dedupe_key, is_read, created_at";

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    recipient_id: String,
    actor_id: Option<String>,
    kind: String,
    title: String,
    body: Option<String>,
    deep_link: Option<String>,
    dedupe_key: Option<String>,
    is_read: bool,
    created_at: i64,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: parse_status("notification kind", &row.kind, NotificationKind::from_db)?,
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            title: row.title,
            body: row.body,
            deep_link: row.deep_link,
            dedupe_key: row.dedupe_key,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create(
        &self,
        new: &NotificationCreate,
        now: i64,
    ) -> StoreResult<Option<Notification>> {
        let row: Option<NotificationRow> = sqlx::query_as(&format!(
            "INSERT INTO notifications
                (id, recipient_id, actor_id, kind, title, body, deep_link, dedupe_key, is_read, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9)
             ON CONFLICT (dedupe_key) WHERE dedupe_key IS NOT NULL DO NOTHING
             RETURNING {COLUMNS}"
        ))
        .bind(snowflake_id())
        .bind(&new.recipient_id)
        .bind(&new.actor_id)
        .bind(new.kind.as_db())
        .bind(&new.title)
        .bind(&new.body)
        .bind(&new.deep_link)
        .bind(&new.dedupe_key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_for_user(&self, user_id: &str, limit: i64) -> StoreResult<Vec<Notification>> {
        let rows: Vec<NotificationRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE recipient_id = $1
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_read(&self, user_id: &str, notification_id: i64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
