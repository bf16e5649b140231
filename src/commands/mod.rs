//! # Command System
//!
//! Text command handling for reminder management.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Reminder commands only, replies independent of the chat transport
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod remind;

pub use remind::{RemindHandler, ReminderCommand};
