//! # Features
//!
//! - **reminders**: storage-backed scheduling, quota tracking and delivery
//! - **messaging**: outbound push channel implementations

pub mod messaging;
pub mod reminders;

pub use messaging::HttpPushChannel;
pub use reminders::{
    classify, DeliveryClient, DeliveryOutcome, MonthWindow, PushChannel, PushError, QuotaTracker,
    ReminderScheduler, SchedulerSettings, SchedulerState, TickReport,
};
