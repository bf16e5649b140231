//! # Reminders Feature
//!
//! Background delivery of stored reminders with monthly quota awareness.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 2.0.0: Pluggable store, delivery outcome classification, quota tracking, cancellable poller
//! - 1.0.0: Scheduled reminder loop

pub mod delivery;
pub mod quota;
pub mod scheduler;

pub use delivery::{classify, DeliveryClient, DeliveryOutcome, PushChannel, PushError};
pub use quota::{MonthWindow, QuotaTracker};
pub use scheduler::{ReminderScheduler, SchedulerSettings, SchedulerState, TickReport};
