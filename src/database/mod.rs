//! # Reminder Store
//!
//! Durable persistence for reminders behind one interface with two
//! interchangeable backends: an embedded single-file SQLite store and a
//! networked PostgreSQL store. Both apply identical status-transition rules.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Extracted `ReminderStore` trait, added PostgreSQL backend, quota-failure tracking
//! - 1.0.0: Initial SQLite reminder table

pub mod error;
pub mod models;
pub mod postgres;
pub mod sqlite;


use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use std::sync::Arc;

use crate::core::config::StoreBackend;
use crate::features::reminders::quota::MonthWindow;

pub use error::StoreError;
pub use models::{Metadata, Reminder, ReminderId, ReminderStatus};
pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Persistence contract shared by every reminder backend
///
/// Implementations must be safe to call concurrently from the poller and from
/// request handlers. Every method is a single logical operation; none of them
/// holds a transaction open across calls.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Insert a new pending reminder and return its id
    async fn add(
        &self,
        owner_id: &str,
        text: &str,
        due_at: DateTime<Utc>,
        metadata: Option<Metadata>,
    ) -> Result<ReminderId, StoreError>;

    async fn get(&self, id: ReminderId) -> Result<Option<Reminder>, StoreError>;

    /// Pending reminders with `due_at <= now`, earliest first
    async fn get_pending(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError>;

    /// Move `Pending -> Sent`. Returns `false` when the record is missing or
    /// already terminal.
    async fn mark_sent(&self, id: ReminderId) -> Result<bool, StoreError>;

    /// Move `Pending -> Failed` (quota cause). Returns `false` when the record
    /// is missing or already terminal.
    async fn mark_failed(&self, id: ReminderId) -> Result<bool, StoreError>;

    /// Quota-failed reminders belonging to `owner_id`
    async fn get_failed(&self, owner_id: &str) -> Result<Vec<Reminder>, StoreError>;

    /// Number of quota-failed reminders, across all owners, with `due_at` in
    /// the half-open range `[start, end)`
    async fn count_quota_failures(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// System-wide circuit breaker: has any delivery failed on quota during
    /// the calendar month containing `now`?
    async fn is_quota_saturated(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let window = MonthWindow::containing(now);
        Ok(self.count_quota_failures(window.start, window.end).await? > 0)
    }

    async fn get_user_reminders(
        &self,
        owner_id: &str,
        include_terminal: bool,
    ) -> Result<Vec<Reminder>, StoreError>;

    /// Delete one reminder if and only if it belongs to `owner_id`
    async fn delete(&self, id: ReminderId, owner_id: &str) -> Result<bool, StoreError>;

    /// Delete every reminder owned by `owner_id`, returning how many went
    async fn delete_all(&self, owner_id: &str) -> Result<u64, StoreError>;
}

/// Open the backend named by configuration and make sure its schema exists
pub async fn open_store(backend: &StoreBackend) -> anyhow::Result<Arc<dyn ReminderStore>> {
    match backend {
        StoreBackend::Sqlite { path } => {
            info!("Opening SQLite reminder store at {path}");
            let store = SqliteStore::open(path).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Postgres {
            url,
            max_connections,
        } => {
            info!("Connecting to PostgreSQL reminder store (pool size {max_connections})");
            let store = PostgresStore::connect(url, *max_connections).await?;
            Ok(Arc::new(store))
        }
    }
}
