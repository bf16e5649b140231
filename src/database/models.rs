//! Reminder records and their lifecycle status
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Store-assigned reminder identifier
pub type ReminderId = i64;

/// Opaque key/value blob attached to a reminder, never interpreted by the store
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Lifecycle status of a reminder
///
/// `Pending` is the only non-terminal status. The persisted codes are part of
/// the on-disk schema and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Waiting to be delivered
    Pending,
    /// Delivered successfully
    Sent,
    /// Delivery refused because the provider's send quota was exhausted
    Failed,
}

impl ReminderStatus {
    pub const fn code(self) -> i64 {
        match self {
            ReminderStatus::Pending => 0,
            ReminderStatus::Sent => 1,
            ReminderStatus::Failed => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ReminderStatus::Pending),
            1 => Some(ReminderStatus::Sent),
            2 => Some(ReminderStatus::Failed),
            _ => None,
        }
    }

}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderStatus::Pending => write!(f, "pending"),
            ReminderStatus::Sent => write!(f, "sent"),
            ReminderStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A persisted one-time notification for a single owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    /// Recipient of the reminder, opaque to the store
    pub owner_id: String,
    /// Message body to deliver
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<Metadata>,
}

impl Reminder {
    /// Whether the poller should pick this reminder up at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.due_at <= now
    }
}

/// Normalise a timestamp to the precision both backends persist
pub fn canonical_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

/// Seconds since the Unix epoch, the embedded backend's on-disk timestamp
pub fn unix_seconds(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp {secs} out of range")))
}

pub fn encode_metadata(metadata: Option<&Metadata>) -> Result<Option<String>, StoreError> {
    metadata
        .map(|m| {
            serde_json::to_string(m)
                .map_err(|e| StoreError::Corrupt(format!("unserialisable metadata: {e}")))
        })
        .transpose()
}

pub fn decode_metadata(raw: Option<&str>) -> Result<Option<Metadata>, StoreError> {
    raw.map(|s| {
        serde_json::from_str::<Metadata>(s)
            .map_err(|e| StoreError::Corrupt(format!("malformed metadata: {e}")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(ReminderStatus::Pending.code(), 0);
        assert_eq!(ReminderStatus::Sent.code(), 1);
        assert_eq!(ReminderStatus::Failed.code(), 2);
        assert_eq!(ReminderStatus::from_code(2), Some(ReminderStatus::Failed));
        assert_eq!(ReminderStatus::from_code(7), None);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ReminderStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_unix_seconds_order_past_year_9999() {
        let near = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        let far = Utc.with_ymd_and_hms(10243, 1, 1, 0, 0, 0).unwrap();
        assert!(unix_seconds(near) < unix_seconds(far));
        assert_eq!(from_unix_seconds(unix_seconds(far)).unwrap(), far);
    }

    #[test]
    fn test_canonical_timestamp_drops_subseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 750_000_000).unwrap();
        assert_eq!(canonical_timestamp(ts).timestamp_subsec_nanos(), 0);
        assert_eq!(canonical_timestamp(ts).timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_bad_timestamp_is_corrupt() {
        assert!(matches!(
            from_unix_seconds(i64::MAX),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_metadata_none_stays_none() {
        assert_eq!(encode_metadata(None).unwrap(), None);
        assert_eq!(decode_metadata(None).unwrap(), None);
        assert!(decode_metadata(Some("[1,2]")).is_err());
    }
}
