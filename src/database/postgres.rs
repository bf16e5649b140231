//! Networked PostgreSQL reminder store
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so building
//! the crate never needs a live database.
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;

use super::error::StoreError;
use super::models::{canonical_timestamp, Metadata, Reminder, ReminderId, ReminderStatus};
use super::ReminderStore;

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS reminders (
        id BIGSERIAL PRIMARY KEY,
        owner_id TEXT NOT NULL,
        text TEXT NOT NULL,
        due_at TIMESTAMPTZ NOT NULL,
        status SMALLINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        metadata JSONB
    )",
    "CREATE INDEX IF NOT EXISTS idx_reminders_owner_due ON reminders (owner_id, due_at)",
    "CREATE INDEX IF NOT EXISTS idx_reminders_status_due ON reminders (status, due_at)",
];

const COLUMNS: &str = "id, owner_id, text, due_at, status, created_at, metadata";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(sqlx::FromRow)]
struct ReminderRow {
    id: i64,
    owner_id: String,
    text: String,
    due_at: DateTime<Utc>,
    status: i16,
    created_at: DateTime<Utc>,
    metadata: Option<Json<Metadata>>,
}

impl TryFrom<ReminderRow> for Reminder {
    type Error = StoreError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        let status = ReminderStatus::from_code(row.status as i64).ok_or_else(|| {
            StoreError::Corrupt(format!("reminder {} has status {}", row.id, row.status))
        })?;

        Ok(Reminder {
            id: row.id,
            owner_id: row.owner_id,
            text: row.text,
            due_at: row.due_at,
            status,
            created_at: row.created_at,
            metadata: row.metadata.map(|Json(m)| m),
        })
    }
}

fn into_reminders(rows: Vec<ReminderRow>) -> Result<Vec<Reminder>, StoreError> {
    rows.into_iter().map(Reminder::try_from).collect()
}

fn status_code(status: ReminderStatus) -> i16 {
    status.code() as i16
}

/// PostgreSQL-backed [`ReminderStore`] over a connection pool
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect a pool to `url` and ensure the schema exists
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        debug!("PostgreSQL reminder schema ready");
        Ok(Self { pool })
    }

    async fn transition(&self, id: ReminderId, target: ReminderStatus) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE reminders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(status_code(target))
            .bind(id)
            .bind(status_code(ReminderStatus::Pending))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ReminderStore for PostgresStore {
    async fn add(
        &self,
        owner_id: &str,
        text: &str,
        due_at: DateTime<Utc>,
        metadata: Option<Metadata>,
    ) -> Result<ReminderId, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO reminders (owner_id, text, due_at, status, created_at, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(owner_id)
        .bind(text)
        .bind(canonical_timestamp(due_at))
        .bind(status_code(ReminderStatus::Pending))
        .bind(canonical_timestamp(Utc::now()))
        .bind(metadata.map(Json))
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StoreError> {
        let row = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {COLUMNS} FROM reminders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Reminder::try_from).transpose()
    }

    async fn get_pending(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE status = $1 AND due_at <= $2
             ORDER BY due_at ASC, id ASC"
        ))
        .bind(status_code(ReminderStatus::Pending))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        into_reminders(rows)
    }

    async fn mark_sent(&self, id: ReminderId) -> Result<bool, StoreError> {
        self.transition(id, ReminderStatus::Sent).await
    }

    async fn mark_failed(&self, id: ReminderId) -> Result<bool, StoreError> {
        self.transition(id, ReminderStatus::Failed).await
    }

    async fn get_failed(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE owner_id = $1 AND status = $2
             ORDER BY due_at ASC, id ASC"
        ))
        .bind(owner_id)
        .bind(status_code(ReminderStatus::Failed))
        .fetch_all(&self.pool)
        .await?;
        into_reminders(rows)
    }

    async fn count_quota_failures(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM reminders WHERE status = $1 AND due_at >= $2 AND due_at < $3",
        )
        .bind(status_code(ReminderStatus::Failed))
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn get_user_reminders(
        &self,
        owner_id: &str,
        include_terminal: bool,
    ) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {COLUMNS} FROM reminders
             WHERE owner_id = $1 AND ($2 OR status = $3)
             ORDER BY due_at ASC, id ASC"
        ))
        .bind(owner_id)
        .bind(include_terminal)
        .bind(status_code(ReminderStatus::Pending))
        .fetch_all(&self.pool)
        .await?;
        into_reminders(rows)
    }

    async fn delete(&self, id: ReminderId, owner_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, owner_id: &str) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM reminders WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
