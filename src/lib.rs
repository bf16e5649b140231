// Core layer - configuration and message shaping
pub mod core;

// Storage layer - reminder persistence backends
pub mod database;

// Features layer - scheduling, quota and delivery
pub mod features;

// Application layer
pub mod commands;

pub use core::Config;
pub use database::{
    open_store, PostgresStore, Reminder, ReminderId, ReminderStatus, ReminderStore, SqliteStore,
    StoreError,
};
pub use features::{
    DeliveryClient, DeliveryOutcome, HttpPushChannel, PushChannel, QuotaTracker,
    ReminderScheduler,
};
