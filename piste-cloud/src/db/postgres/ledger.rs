use async_trait::async_trait;
use shared::models::{
    LedgerStatus, LifecycleStatus, PaymentApproval, PaymentAttempt, PaymentStatus,
    ReservationIntent,
};
use shared::util::snowflake_id;

use super::{PgStore, is_unique_violation, parse_status};
use crate::db::{LedgerStore, ReservationCreate, StoreError, StoreResult};

const RESERVATION_COLUMNS: &str = "id, class_id, user_id, status, payment_status, amount, \
     order_id, confirmed_at, created_at, updated_at";

const ATTEMPT_COLUMNS: &str = "order_id, reservation_id, user_id, class_id, amount, platform_fee, \
     status, payment_key, method, approved_at, failure_code, failure_message, metadata, \
     created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    class_id: i64,
    user_id: String,
    status: String,
    payment_status: String,
    amount: i64,
    order_id: Option<String>,
    confirmed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ReservationRow> for ReservationIntent {
    type Error = StoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            class_id: row.class_id,
            user_id: row.user_id,
            status: parse_status("reservation status", &row.status, LifecycleStatus::from_db)?,
            payment_status: parse_status(
                "reservation payment_status",
                &row.payment_status,
                PaymentStatus::from_db,
            )?,
            amount: row.amount,
            order_id: row.order_id,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    order_id: String,
    reservation_id: i64,
    user_id: String,
    class_id: i64,
    amount: i64,
    platform_fee: i64,
    status: String,
    payment_key: Option<String>,
    method: Option<String>,
    approved_at: Option<i64>,
    failure_code: Option<String>,
    failure_message: Option<String>,
    metadata: Option<serde_json::Value>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AttemptRow> for PaymentAttempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_status("payment_attempt status", &row.status, LedgerStatus::from_db)?,
            order_id: row.order_id,
            reservation_id: row.reservation_id,
            user_id: row.user_id,
            class_id: row.class_id,
            amount: row.amount,
            platform_fee: row.platform_fee,
            payment_key: row.payment_key,
            method: row.method,
            approved_at: row.approved_at,
            failure_code: row.failure_code,
            failure_message: row.failure_message,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn find_reservation(
        &self,
        class_id: i64,
        user_id: &str,
    ) -> StoreResult<Option<ReservationIntent>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE class_id = $1 AND user_id = $2"
        ))
        .bind(class_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn get_reservation(&self, id: i64) -> StoreResult<Option<ReservationIntent>> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn create_reservation(
        &self,
        new: &ReservationCreate,
    ) -> StoreResult<(ReservationIntent, bool)> {
        // INSERT first; a lost race on (class_id, user_id) falls through to the existing row
        let inserted: Option<ReservationRow> = sqlx::query_as(&format!(
            "INSERT INTO reservations
                (id, class_id, user_id, status, payment_status, amount, created_at, updated_at)
             VALUES ($1, $2, $3, 'requested', 'pending', $4, $5, $5)
             ON CONFLICT (class_id, user_id) DO NOTHING
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(snowflake_id())
        .bind(new.class_id)
        .bind(&new.user_id)
        .bind(new.amount)
        .bind(new.now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.try_into()?, true));
        }
        let existing = self
            .find_reservation(new.class_id, &new.user_id)
            .await?
            .ok_or(StoreError::NotFound("Reservation"))?;
        Ok((existing, false))
    }

    async fn begin_payment(
        &self,
        reservation_id: i64,
        order_id: &str,
        amount: i64,
        now: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE reservations
             SET status = 'requested', payment_status = 'pending',
                 order_id = $2, amount = $3, updated_at = $4
             WHERE id = $1 AND NOT (status = 'confirmed' AND payment_status = 'paid')",
        )
        .bind(reservation_id)
        .bind(order_id)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn confirm_reservation(
        &self,
        reservation_id: i64,
        confirmed_at: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE reservations
             SET status = 'confirmed', payment_status = 'paid',
                 confirmed_at = $2, updated_at = $3
             WHERE id = $1 AND NOT (status = 'confirmed' AND payment_status = 'paid')",
        )
        .bind(reservation_id)
        .bind(confirmed_at)
        .bind(shared::util::now_millis())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_payment_status(
        &self,
        reservation_id: i64,
        order_id: &str,
        status: PaymentStatus,
        now: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE reservations SET payment_status = $3, updated_at = $4
             WHERE id = $1 AND order_id = $2 AND payment_status <> 'paid'",
        )
        .bind(reservation_id)
        .bind(order_id)
        .bind(status.as_db())
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_attempt(&self, attempt: &PaymentAttempt) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO payment_attempts
                (order_id, reservation_id, user_id, class_id, amount, platform_fee, status,
                 payment_key, method, approved_at, failure_code, failure_message, metadata,
                 created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(&attempt.order_id)
        .bind(attempt.reservation_id)
        .bind(&attempt.user_id)
        .bind(attempt.class_id)
        .bind(attempt.amount)
        .bind(attempt.platform_fee)
        .bind(attempt.status.as_db())
        .bind(&attempt.payment_key)
        .bind(&attempt.method)
        .bind(attempt.approved_at)
        .bind(&attempt.failure_code)
        .bind(&attempt.failure_message)
        .bind(&attempt.metadata)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("order {} already exists", attempt.order_id))
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn find_attempt(&self, order_id: &str) -> StoreResult<Option<PaymentAttempt>> {
        let row: Option<AttemptRow> = sqlx::query_as(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM payment_attempts WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn mark_attempt_paid(
        &self,
        order_id: &str,
        approval: &PaymentApproval,
        metadata: Option<serde_json::Value>,
        now: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE payment_attempts
             SET status = 'paid', payment_key = $2, method = $3, approved_at = $4,
                 failure_code = NULL, failure_message = NULL,
                 metadata = COALESCE($5, metadata), updated_at = $6
             WHERE order_id = $1 AND NOT (status = 'paid' AND payment_key IS NOT NULL)",
        )
        .bind(order_id)
        .bind(&approval.payment_key)
        .bind(&approval.method)
        .bind(approval.approved_at)
        .bind(metadata)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
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
        let result = sqlx::query(
            "UPDATE payment_attempts
             SET status = $2, failure_code = $3, failure_message = $4,
                 metadata = COALESCE($5, metadata), updated_at = $6
             WHERE order_id = $1 AND status <> 'paid'",
        )
        .bind(order_id)
        .bind(status.as_db())
        .bind(failure_code)
        .bind(failure_message)
        .bind(metadata)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_webhook(
        &self,
        order_id: &str,
        metadata: serde_json::Value,
        now: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE payment_attempts
             SET metadata = $2, updated_at = $3,
                 status = CASE WHEN status = 'ready' THEN 'webhook_received' ELSE status END
             WHERE order_id = $1 AND status <> 'paid'",
        )
        .bind(order_id)
        .bind(metadata)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
