//! # Messaging Feature
//!
//! Outbound channels that reminders are pushed through.
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0
//! - **Toggleable**: false

pub mod http;

pub use http::HttpPushChannel;
