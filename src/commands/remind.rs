//! Reminder command handlers
//!
//! Handles: remind, reminders (list, cancel, clear, failed)
//!
//! Replies are plain text so any chat transport can relay them.
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Transport-agnostic replies, owner-scoped clear, undelivered listing, quota warning
//! - 1.0.0: Extracted from command_handler.rs

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use crate::database::{Metadata, Reminder, ReminderId, ReminderStore};

/// Furthest ahead a reminder can be scheduled (about five years)
const MAX_REMINDER_SECONDS: i64 = 5 * 365 * 24 * 60 * 60;

/// A parsed reminder command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderCommand {
    /// `remind <time> <message>`
    Remind { time: String, message: String },
    /// `reminders` / `reminders list`
    List,
    /// `reminders cancel <id>`
    Cancel { id: Option<ReminderId> },
    /// `reminders clear`
    CancelAll,
    /// `reminders failed`
    Undelivered,
}

impl ReminderCommand {
    /// Parse a command name and its raw argument string
    ///
    /// Returns `None` for commands this handler does not own.
    pub fn parse(name: &str, args: &str) -> Option<Self> {
        let args = args.trim();
        match name {
            "remind" => {
                let (time, message) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
                Some(ReminderCommand::Remind {
                    time: time.to_string(),
                    message: message.trim().to_string(),
                })
            }
            "reminders" => {
                let mut parts = args.split_whitespace();
                match parts.next().map(|a| a.to_lowercase()).as_deref() {
                    None | Some("list") => Some(ReminderCommand::List),
                    Some("cancel") => Some(ReminderCommand::Cancel {
                        id: parts
                            .next()
                            .and_then(|id| id.trim_start_matches('#').parse().ok()),
                    }),
                    Some("clear") => Some(ReminderCommand::CancelAll),
                    Some("failed") => Some(ReminderCommand::Undelivered),
                    Some(_) => Some(ReminderCommand::List),
                }
            }
            _ => None,
        }
    }
}

const INVALID_TIME: &str =
    "❌ Invalid time format. Use formats like `30m`, `2h`, `1d`, or `1h30m`.";

/// Handler for reminder-related commands
pub struct RemindHandler {
    store: Arc<dyn ReminderStore>,
}

impl RemindHandler {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        owner_id: &str,
        command: ReminderCommand,
        now: DateTime<Utc>,
    ) -> Result<String> {
        match command {
            ReminderCommand::Remind { time, message } => {
                self.remind(owner_id, &time, &message, now).await
            }
            ReminderCommand::List => self.list(owner_id, now).await,
            ReminderCommand::Cancel { id } => self.cancel(owner_id, id).await,
            ReminderCommand::CancelAll => self.cancel_all(owner_id).await,
            ReminderCommand::Undelivered => self.undelivered(owner_id).await,
        }
    }

    /// Create a new reminder `time_str` from `now`
    pub async fn remind(
        &self,
        owner_id: &str,
        time_str: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let Some(duration_seconds) = Self::parse_duration(time_str) else {
            return Ok(INVALID_TIME.to_string());
        };
        if duration_seconds > MAX_REMINDER_SECONDS {
            return Ok("❌ That's too far away. Reminders can be set up to 5 years ahead.".to_string());
        }
        let Some(remind_at) = chrono::Duration::try_seconds(duration_seconds)
            .and_then(|delta| now.checked_add_signed(delta))
        else {
            return Ok(INVALID_TIME.to_string());
        };
        if message.is_empty() {
            return Ok("❌ Tell me what to remind you about, e.g. `remind 30m stretch`.".to_string());
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("remind_command"));
        metadata.insert("requested".to_string(), json!(time_str));

        let reminder_id = self
            .store
            .add(owner_id, message, remind_at, Some(metadata))
            .await?;

        let duration_display = Self::format_duration(duration_seconds);
        info!(
            "Created reminder {} for user {} in {} ({})",
            reminder_id,
            owner_id,
            duration_display,
            remind_at.format("%Y-%m-%d %H:%M:%S")
        );

        let mut reply = format!(
            "⏰ Got it! I'll remind you in **{duration_display}** about:\n> {message}\n\n*Reminder ID: #{reminder_id}*"
        );

        match self.store.is_quota_saturated(now).await {
            Ok(true) => reply.push_str(
                "\n\n⚠️ I've reached my monthly message limit, so this reminder may not reach you until the limit resets.",
            ),
            Ok(false) => {}
            Err(e) => warn!("Could not check delivery quota: {e}"),
        }

        Ok(reply)
    }

    /// List pending reminders
    pub async fn list(&self, owner_id: &str, now: DateTime<Utc>) -> Result<String> {
        let reminders = self.store.get_user_reminders(owner_id, false).await?;

        if reminders.is_empty() {
            return Ok(
                "📋 You don't have any pending reminders.\n\nUse `remind <time> <message>` to create one!"
                    .to_string(),
            );
        }

        let mut reminder_list = String::from("📋 **Your Pending Reminders:**\n\n");
        for reminder in &reminders {
            let time_display = if reminder.is_due(now) {
                "any moment now".to_string()
            } else {
                let diff = reminder.due_at.signed_duration_since(now);
                format!("in {}", Self::format_duration(diff.num_seconds()))
            };
            reminder_list.push_str(&format!(
                "**#{}** - {} ({})\n> {}\n\n",
                reminder.id,
                time_display,
                reminder.due_at.format("%Y-%m-%d %H:%M:%S"),
                reminder.text
            ));
        }
        reminder_list.push_str("*Use `reminders cancel <id>` to cancel a reminder.*");

        Ok(reminder_list)
    }

    /// Cancel a specific reminder
    pub async fn cancel(&self, owner_id: &str, id: Option<ReminderId>) -> Result<String> {
        let Some(id) = id else {
            return Ok(
                "❌ Please provide a reminder ID to cancel. Use `reminders` to see your reminder IDs."
                    .to_string(),
            );
        };

        if self.store.delete(id, owner_id).await? {
            info!("Deleted reminder {id} for user {owner_id}");
            Ok(format!("✅ Cancelled reminder #{id}."))
        } else {
            Ok(format!(
                "❌ Reminder #{id} not found or doesn't belong to you."
            ))
        }
    }

    /// Cancel every reminder the user owns
    pub async fn cancel_all(&self, owner_id: &str) -> Result<String> {
        let removed = self.store.delete_all(owner_id).await?;
        info!("Deleted {removed} reminder(s) for user {owner_id}");
        Ok(match removed {
            0 => "📋 You didn't have any reminders to clear.".to_string(),
            1 => "🧹 Cleared 1 reminder.".to_string(),
            n => format!("🧹 Cleared {n} reminders."),
        })
    }

    /// List reminders that could not be delivered because of the message quota
    pub async fn undelivered(&self, owner_id: &str) -> Result<String> {
        let failed = self.store.get_failed(owner_id).await?;
        if failed.is_empty() {
            return Ok("✅ All of your reminders were delivered.".to_string());
        }

        let mut reply = String::from(
            "⚠️ **These reminders couldn't be delivered (monthly message limit reached):**\n\n",
        );
        for reminder in &failed {
            reply.push_str(&Self::format_failed(reminder));
        }
        Ok(reply)
    }

    fn format_failed(reminder: &Reminder) -> String {
        format!(
            "**#{}** - was due {}\n> {}\n\n",
            reminder.id,
            reminder.due_at.format("%Y-%m-%d %H:%M:%S"),
            reminder.text
        )
    }

    /// Parse a time duration string like "30m", "2h", "1d", "1h30m" into seconds
    fn parse_duration(time_str: &str) -> Option<i64> {
        let time_str = time_str.trim().to_lowercase();
        let mut total_seconds: i64 = 0;
        let mut current_number = String::new();

        for c in time_str.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let value: i64 = current_number.parse().ok()?;
                current_number.clear();

                let unit_seconds: i64 = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 60 * 60,
                    'd' => 60 * 60 * 24,
                    'w' => 60 * 60 * 24 * 7,
                    _ => return None,
                };
                total_seconds = total_seconds.checked_add(value.checked_mul(unit_seconds)?)?;
            } else {
                return None;
            }
        }

        // Trailing digits without a unit ("90") are ambiguous
        if !current_number.is_empty() {
            return None;
        }

        (total_seconds > 0).then_some(total_seconds)
    }

    /// Format a duration in seconds into a human-readable string
    fn format_duration(seconds: i64) -> String {
        fn unit(n: i64, name: &str) -> String {
            format!("{} {}{}", n, name, if n == 1 { "" } else { "s" })
        }

        if seconds < 60 {
            unit(seconds, "second")
        } else if seconds < 3600 {
            unit(seconds / 60, "minute")
        } else if seconds < 86400 {
            let (hours, mins) = (seconds / 3600, (seconds % 3600) / 60);
            if mins > 0 {
                format!("{} {}", unit(hours, "hour"), unit(mins, "minute"))
            } else {
                unit(hours, "hour")
            }
        } else {
            let (days, hours) = (seconds / 86400, (seconds % 86400) / 3600);
            if hours > 0 {
                format!("{} {}", unit(days, "day"), unit(hours, "hour"))
            } else {
                unit(days, "day")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ReminderStatus, SqliteStore};
    use chrono::TimeZone;

    async fn handler() -> (Arc<SqliteStore>, RemindHandler) {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        (store.clone(), RemindHandler::new(store))
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_remind_handler_commands() {
        let names = ["remind", "reminders"];
        for name in names {
            assert!(ReminderCommand::parse(name, "").is_some());
        }
        assert!(ReminderCommand::parse("forget", "").is_none());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ReminderCommand::parse("remind", "1h30m  call the hotel  "),
            Some(ReminderCommand::Remind {
                time: "1h30m".to_string(),
                message: "call the hotel".to_string()
            })
        );
        assert_eq!(ReminderCommand::parse("reminders", ""), Some(ReminderCommand::List));
        assert_eq!(
            ReminderCommand::parse("reminders", "cancel #12"),
            Some(ReminderCommand::Cancel { id: Some(12) })
        );
        assert_eq!(
            ReminderCommand::parse("reminders", "cancel"),
            Some(ReminderCommand::Cancel { id: None })
        );
        assert_eq!(
            ReminderCommand::parse("reminders", "CLEAR"),
            Some(ReminderCommand::CancelAll)
        );
        assert_eq!(
            ReminderCommand::parse("reminders", "failed"),
            Some(ReminderCommand::Undelivered)
        );
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(RemindHandler::parse_duration("30s"), Some(30));
        assert_eq!(RemindHandler::parse_duration("30m"), Some(1800));
        assert_eq!(RemindHandler::parse_duration("2h"), Some(7200));
        assert_eq!(RemindHandler::parse_duration("1d"), Some(86400));
        assert_eq!(RemindHandler::parse_duration("1w"), Some(604800));
        assert_eq!(RemindHandler::parse_duration("1h30m"), Some(5400));
        assert_eq!(RemindHandler::parse_duration("90"), None);
        assert_eq!(RemindHandler::parse_duration("invalid"), None);
        assert_eq!(RemindHandler::parse_duration(""), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(RemindHandler::format_duration(30), "30 seconds");
        assert_eq!(RemindHandler::format_duration(1), "1 second");
        assert_eq!(RemindHandler::format_duration(60), "1 minute");
        assert_eq!(RemindHandler::format_duration(120), "2 minutes");
        assert_eq!(RemindHandler::format_duration(3600), "1 hour");
        assert_eq!(RemindHandler::format_duration(3660), "1 hour 1 minute");
        assert_eq!(RemindHandler::format_duration(86400), "1 day");
        assert_eq!(RemindHandler::format_duration(90000), "1 day 1 hour");
    }

    #[tokio::test]
    async fn test_remind_stores_reminder_with_metadata() {
        let (store, handler) = handler().await;

        let reply = handler
            .remind("U1", "2h", "check out of the hostel", noon())
            .await
            .unwrap();

        assert!(reply.contains("2 hours"));
        assert!(!reply.contains("monthly message limit"));
        let reminders = store.get_user_reminders("U1", false).await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].due_at, noon() + chrono::Duration::hours(2));
        let metadata = reminders[0].metadata.as_ref().unwrap();
        assert_eq!(metadata["source"], "remind_command");
        assert_eq!(metadata["requested"], "2h");
    }

    #[tokio::test]
    async fn test_remind_rejects_bad_input_without_storing() {
        let (store, handler) = handler().await;

        let reply = handler.remind("U1", "later", "x", noon()).await.unwrap();
        assert!(reply.starts_with("❌"));
        let reply = handler.remind("U1", "10m", "", noon()).await.unwrap();
        assert!(reply.starts_with("❌"));

        assert!(store.get_user_reminders("U1", true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remind_refuses_out_of_range_durations() {
        let (store, handler) = handler().await;

        for time in ["9300000000000000s", "3000000d", "300w"] {
            let reply = handler.remind("U1", time, "x", noon()).await.unwrap();
            assert!(reply.starts_with("❌"), "expected refusal for {time}: {reply}");
        }

        assert!(store.get_user_reminders("U1", true).await.unwrap().is_empty());
        assert!(store
            .get_pending(noon() + chrono::Duration::days(365 * 10))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_remind_accepts_up_to_five_years() {
        let (store, handler) = handler().await;

        let reply = handler.remind("U1", "1825d", "renew passport", noon()).await.unwrap();

        assert!(reply.starts_with("⏰"));
        let reminders = store.get_user_reminders("U1", false).await.unwrap();
        assert_eq!(reminders[0].due_at, noon() + chrono::Duration::days(1825));
    }

    #[tokio::test]
    async fn test_remind_warns_when_quota_saturated() {
        let (store, handler) = handler().await;
        let id = store
            .add("U2", "earlier", noon() - chrono::Duration::hours(1), None)
            .await
            .unwrap();
        store.mark_failed(id).await.unwrap();

        let reply = handler.remind("U1", "30m", "stretch", noon()).await.unwrap();

        assert!(reply.contains("monthly message limit"));
        assert_eq!(store.get_user_reminders("U1", false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_shows_only_own_pending() {
        let (store, handler) = handler().await;
        handler.remind("U1", "1h", "mine", noon()).await.unwrap();
        handler.remind("U2", "1h", "theirs", noon()).await.unwrap();
        let done = store.add("U1", "done already", noon(), None).await.unwrap();
        store.mark_sent(done).await.unwrap();

        let reply = handler.list("U1", noon()).await.unwrap();

        assert!(reply.contains("mine"));
        assert!(reply.contains("in 1 hour"));
        assert!(!reply.contains("theirs"));
        assert!(!reply.contains("done already"));
    }

    #[tokio::test]
    async fn test_cancel_is_owner_scoped() {
        let (store, handler) = handler().await;
        let id = store.add("U2", "theirs", noon(), None).await.unwrap();

        let reply = handler.cancel("U1", Some(id)).await.unwrap();
        assert!(reply.contains("not found"));
        assert!(store.get(id).await.unwrap().is_some());

        let reply = handler.cancel("U2", Some(id)).await.unwrap();
        assert!(reply.starts_with("✅"));
        assert!(store.get(id).await.unwrap().is_none());

        let reply = handler.cancel("U2", None).await.unwrap();
        assert!(reply.contains("provide a reminder ID"));
    }

    #[tokio::test]
    async fn test_clear_and_undelivered() {
        let (store, handler) = handler().await;
        let failed = store.add("U1", "missed it", noon(), None).await.unwrap();
        store.mark_failed(failed).await.unwrap();
        store.add("U1", "pending", noon(), None).await.unwrap();

        let reply = handler
            .handle("U1", ReminderCommand::Undelivered, noon())
            .await
            .unwrap();
        assert!(reply.contains("missed it"));
        assert!(!reply.contains("pending"));

        let reply = handler
            .handle("U1", ReminderCommand::CancelAll, noon())
            .await
            .unwrap();
        assert_eq!(reply, "🧹 Cleared 2 reminders.");
        assert_eq!(
            store.get(failed).await.unwrap().map(|r| r.status),
            None::<ReminderStatus>
        );
    }
}
