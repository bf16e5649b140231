//! Reminder store errors

/// Failures surfaced by a [`ReminderStore`](super::ReminderStore) backend.
///
/// Missing or foreign records are not errors: mark operations report a no-op
/// and deletes report `false`/`0`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage medium could not be reached or the operation was rejected
    /// by it. No state change is observable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A persisted row could not be decoded.
    #[error("corrupt reminder record: {0}")]
    Corrupt(String),
}

impl From<sqlite::Error> for StoreError {
    fn from(e: sqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
