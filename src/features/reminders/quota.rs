//! # Feature: Delivery Quota Tracking
//!
//! Provider send quotas reset monthly and only become visible when a push is
//! refused. Any quota-caused failure with a due time in the current UTC month
//! marks the whole system as saturated until the month rolls over.
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0
//! - **Toggleable**: false

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::sync::Arc;

use crate::database::{ReminderStore, StoreError};

/// Half-open calendar month `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// The calendar month that contains `now`
    pub fn containing(now: DateTime<Utc>) -> Self {
        let (year, month) = (now.year(), now.month());
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };

        Self {
            start: first_of_month(year, month),
            end: first_of_month(next_year, next_month),
        }
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    // Only out-of-range years can miss here
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Read-only view answering "has the provider quota been hit this month?"
///
/// Holds no state of its own; every call is a fresh query against the store.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn ReminderStore>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    /// Saturation for the current wall-clock month
    pub async fn is_saturated(&self) -> Result<bool, StoreError> {
        self.is_saturated_at(Utc::now()).await
    }

    pub async fn is_saturated_at(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.store.is_quota_saturated(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_month_window_bounds() {
        let window = MonthWindow::containing(ts(2024, 2, 14, 9, 30, 0));
        assert_eq!(window.start, ts(2024, 2, 1, 0, 0, 0));
        assert_eq!(window.end, ts(2024, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_window_rolls_over_year() {
        let window = MonthWindow::containing(ts(2024, 12, 31, 23, 59, 59));
        assert_eq!(window.start, ts(2024, 12, 1, 0, 0, 0));
        assert_eq!(window.end, ts(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_month_window_from_first_instant() {
        let window = MonthWindow::containing(ts(2024, 6, 1, 0, 0, 0));
        assert_eq!(window.start, ts(2024, 6, 1, 0, 0, 0));
        assert_eq!(window.end, ts(2024, 7, 1, 0, 0, 0));
    }

    #[tokio::test]
    async fn test_tracker_follows_store() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let tracker = QuotaTracker::new(store.clone());
        let now = ts(2024, 6, 15, 12, 0, 0);

        assert!(!tracker.is_saturated_at(now).await.unwrap());

        let id = store
            .add("user-1", "stretch", ts(2024, 6, 15, 11, 0, 0), None)
            .await
            .unwrap();
        store.mark_failed(id).await.unwrap();

        assert!(tracker.is_saturated_at(now).await.unwrap());
        // A new month starts clean
        assert!(!tracker.is_saturated_at(ts(2024, 7, 1, 0, 0, 0)).await.unwrap());
    }
}
