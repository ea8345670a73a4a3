use async_trait::async_trait;
use shared::models::{ClassStatus, ClassSubject, Profile};
use shared::util::pick_one;

use super::{PgStore, parse_status};
use crate::db::{CatalogStore, StoreResult};

#[derive(sqlx::FromRow)]
struct ClassRow {
    id: i64,
    title: String,
    price: i64,
    status: String,
    coach_id: String,
    /// Joined profile: array, object or null depending on the join
    coach: Option<serde_json::Value>,
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn find_class(&self, class_id: i64) -> StoreResult<Option<ClassSubject>> {
        let row: Option<ClassRow> = sqlx::query_as(
            "SELECT c.id, c.title, c.price, c.status, c.coach_id,
                    (SELECT jsonb_agg(jsonb_build_object(
                                'id', p.id, 'display_name', p.display_name, 'email', p.email))
                     FROM profiles p WHERE p.id = c.coach_id) AS coach
             FROM classes c
             WHERE c.id = $1",
        )
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(ClassSubject {
            status: parse_status("class status", &row.status, ClassStatus::from_db)?,
            coach: row.coach.and_then(pick_one::<Profile>),
            id: row.id,
            title: row.title,
            price: row.price,
            coach_id: row.coach_id,
        }))
    }

    async fn find_profile(&self, user_id: &str) -> StoreResult<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, display_name, email FROM profiles WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }
}
