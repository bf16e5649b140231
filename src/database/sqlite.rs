//! Embedded single-file reminder store
//!
//! Timestamps are stored as INTEGER Unix seconds, so SQL comparison and
//! ordering are chronological for every representable date.
//!
//! Statements run on tokio's blocking pool: the `sqlite` crate is synchronous
//! and a locked file can hold a call for up to the busy timeout.
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.1.0: Integer timestamps, statements moved off the async workers
//! - 2.0.0: Status codes, metadata column, quota-failure queries
//! - 1.0.0: Initial reminder table

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlite::{Connection, State, Statement};
use std::sync::{Arc, Mutex};

use super::error::StoreError;
use super::models::{
    canonical_timestamp, decode_metadata, encode_metadata, from_unix_seconds, unix_seconds,
    Metadata, Reminder, ReminderId, ReminderStatus,
};
use super::ReminderStore;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        text TEXT NOT NULL,
        due_at INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        metadata TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_owner_due ON reminders(owner_id, due_at);
    CREATE INDEX IF NOT EXISTS idx_reminders_status_due ON reminders(status, due_at);
";

const COLUMNS: &str = "id, owner_id, text, due_at, status, created_at, metadata";

/// Milliseconds to wait on a locked database file before giving up
const BUSY_TIMEOUT_MS: usize = 5_000;

/// SQLite-backed [`ReminderStore`]
///
/// One connection shared behind a mutex; each trait call locks it on a
/// blocking-pool thread for exactly one statement (plus the rowid read after
/// an insert).
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and ensure the schema exists
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let owned = path.to_string();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, StoreError> {
            let mut conn = sqlite::open(&owned)?;
            conn.set_busy_timeout(BUSY_TIMEOUT_MS)?;
            if owned != ":memory:" {
                conn.execute("PRAGMA journal_mode = WAL;")?;
            }
            conn.execute(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("sqlite open task failed: {e}")))??;
        debug!("SQLite reminder schema ready at {path}");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Private in-memory database, used by tests and throwaway tooling
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:").await
    }

    /// Run `work` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection poisoned".to_string()))?;
            work(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("sqlite task failed: {e}")))?
    }

    fn read_reminder(stmt: &Statement<'_>) -> Result<Reminder, StoreError> {
        let id = stmt.read::<i64, _>("id")?;
        let code = stmt.read::<i64, _>("status")?;
        let status = ReminderStatus::from_code(code)
            .ok_or_else(|| StoreError::Corrupt(format!("reminder {id} has status {code}")))?;
        let metadata = stmt.read::<Option<String>, _>("metadata")?;

        Ok(Reminder {
            id,
            owner_id: stmt.read::<String, _>("owner_id")?,
            text: stmt.read::<String, _>("text")?,
            due_at: from_unix_seconds(stmt.read::<i64, _>("due_at")?)?,
            status,
            created_at: from_unix_seconds(stmt.read::<i64, _>("created_at")?)?,
            metadata: decode_metadata(metadata.as_deref())?,
        })
    }

    fn collect(mut stmt: Statement<'_>) -> Result<Vec<Reminder>, StoreError> {
        let mut reminders = Vec::new();
        while let State::Row = stmt.next()? {
            reminders.push(Self::read_reminder(&stmt)?);
        }
        Ok(reminders)
    }

    /// Conditional `Pending -> target` update; true when a row changed
    async fn transition(&self, id: ReminderId, target: ReminderStatus) -> Result<bool, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("UPDATE reminders SET status = ? WHERE id = ? AND status = ?")?;
            stmt.bind((1, target.code()))?;
            stmt.bind((2, id))?;
            stmt.bind((3, ReminderStatus::Pending.code()))?;
            stmt.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }
}

#[async_trait]
impl ReminderStore for SqliteStore {
    async fn add(
        &self,
        owner_id: &str,
        text: &str,
        due_at: DateTime<Utc>,
        metadata: Option<Metadata>,
    ) -> Result<ReminderId, StoreError> {
        let due_at = unix_seconds(canonical_timestamp(due_at));
        let created_at = unix_seconds(canonical_timestamp(Utc::now()));
        let metadata = encode_metadata(metadata.as_ref())?;
        let (owner_id, text) = (owner_id.to_string(), text.to_string());

        self.with_conn(move |conn| {
            {
                let mut stmt = conn.prepare(
                    "INSERT INTO reminders (owner_id, text, due_at, status, created_at, metadata)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )?;
                stmt.bind((1, owner_id.as_str()))?;
                stmt.bind((2, text.as_str()))?;
                stmt.bind((3, due_at))?;
                stmt.bind((4, ReminderStatus::Pending.code()))?;
                stmt.bind((5, created_at))?;
                stmt.bind((6, metadata.as_deref()))?;
                stmt.next()?;
            }

            let mut stmt = conn.prepare("SELECT last_insert_rowid()")?;
            match stmt.next()? {
                State::Row => Ok(stmt.read::<i64, _>(0usize)?),
                State::Done => Err(StoreError::Unavailable(
                    "insert did not yield a row id".to_string(),
                )),
            }
        })
        .await
    }

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StoreError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(format!("SELECT {COLUMNS} FROM reminders WHERE id = ?"))?;
            stmt.bind((1, id))?;
            Ok(Self::collect(stmt)?.into_iter().next())
        })
        .await
    }

    async fn get_pending(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let now = unix_seconds(now);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(format!(
                "SELECT {COLUMNS} FROM reminders
                 WHERE status = ? AND due_at <= ?
                 ORDER BY due_at ASC, id ASC"
            ))?;
            stmt.bind((1, ReminderStatus::Pending.code()))?;
            stmt.bind((2, now))?;
            Self::collect(stmt)
        })
        .await
    }

    async fn mark_sent(&self, id: ReminderId) -> Result<bool, StoreError> {
        self.transition(id, ReminderStatus::Sent).await
    }

    async fn mark_failed(&self, id: ReminderId) -> Result<bool, StoreError> {
        self.transition(id, ReminderStatus::Failed).await
    }

    async fn get_failed(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(format!(
                "SELECT {COLUMNS} FROM reminders
                 WHERE owner_id = ? AND status = ?
                 ORDER BY due_at ASC, id ASC"
            ))?;
            stmt.bind((1, owner_id.as_str()))?;
            stmt.bind((2, ReminderStatus::Failed.code()))?;
            Self::collect(stmt)
        })
        .await
    }

    async fn count_quota_failures(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let (start, end) = (unix_seconds(start), unix_seconds(end));
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT COUNT(*) FROM reminders WHERE status = ? AND due_at >= ? AND due_at < ?",
            )?;
            stmt.bind((1, ReminderStatus::Failed.code()))?;
            stmt.bind((2, start))?;
            stmt.bind((3, end))?;
            match stmt.next()? {
                State::Row => Ok(stmt.read::<i64, _>(0usize)?.max(0) as u64),
                State::Done => Ok(0),
            }
        })
        .await
    }

    async fn get_user_reminders(
        &self,
        owner_id: &str,
        include_terminal: bool,
    ) -> Result<Vec<Reminder>, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(format!(
                "SELECT {COLUMNS} FROM reminders
                 WHERE owner_id = ? AND (? = 1 OR status = ?)
                 ORDER BY due_at ASC, id ASC"
            ))?;
            stmt.bind((1, owner_id.as_str()))?;
            stmt.bind((2, include_terminal as i64))?;
            stmt.bind((3, ReminderStatus::Pending.code()))?;
            Self::collect(stmt)
        })
        .await
    }

    async fn delete(&self, id: ReminderId, owner_id: &str) -> Result<bool, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("DELETE FROM reminders WHERE id = ? AND owner_id = ?")?;
            stmt.bind((1, id))?;
            stmt.bind((2, owner_id.as_str()))?;
            stmt.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }

    async fn delete_all(&self, owner_id: &str) -> Result<u64, StoreError> {
        let owner_id = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare("DELETE FROM reminders WHERE owner_id = ?")?;
            stmt.bind((1, owner_id.as_str()))?;
            stmt.next()?;
            Ok(conn.change_count() as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::contract_tests;
    use chrono::Duration;

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let store = SqliteStore::in_memory().await.unwrap();
        contract_tests::run_all(&store).await;
    }

    #[tokio::test]
    async fn test_reminders_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let path = path.to_str().unwrap();
        let due = Utc::now() - Duration::seconds(5);

        let id = {
            let store = SqliteStore::open(path).await.unwrap();
            store.add("user-1", "water the plants", due, None).await.unwrap()
        };

        let reopened = SqliteStore::open(path).await.unwrap();
        let pending = reopened.get_pending(Utc::now()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].text, "water the plants");
    }

    #[tokio::test]
    async fn test_year_10243_is_not_due_today() {
        use chrono::TimeZone;

        let store = SqliteStore::in_memory().await.unwrap();
        let far = Utc.with_ymd_and_hms(10243, 1, 1, 0, 0, 0).unwrap();
        store.add("U1", "far", far, None).await.unwrap();
        let normal = store
            .add("U2", "normal", Utc::now() - Duration::seconds(1), None)
            .await
            .unwrap();

        let ids: Vec<_> = store
            .get_pending(Utc::now())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![normal]);
    }

    #[tokio::test]
    async fn test_unknown_status_code_is_reported_as_corrupt() {
        let store = SqliteStore::in_memory().await.unwrap();
        let id = store
            .add("user-1", "hello", Utc::now(), None)
            .await
            .unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(format!("UPDATE reminders SET status = 9 WHERE id = {id}"))
                .unwrap();
        }

        assert!(matches!(store.get(id).await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_concurrent_adds_get_distinct_ids() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add(&format!("user-{i}"), "ping", Utc::now(), None)
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }
}
