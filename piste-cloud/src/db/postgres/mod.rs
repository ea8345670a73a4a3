//! PostgreSQL store (sqlx)
//!
//! Status columns are lowercase text; rows are read into private `*Row`
//! structs and converted with the models' `from_db`.

mod catalog;
mod devices;
mod ledger;
mod notifications;
mod push_logs;
mod settings;

use sqlx::PgPool;

use super::StoreError;

/// Postgres-backed implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Parse a text status column
fn parse_status<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> Result<T, StoreError> {
    parse(value).ok_or_else(|| StoreError::Database(format!("invalid {column}: {value}").into()))
}

/// Unique-constraint violation (SQLSTATE 23505)
fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}
