//! # Core Module
//!
//! Configuration and push message shaping shared by every feature.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Reminder store backend and push channel configuration, character-based push limits
//! - 1.1.0: Add response module with message chunking utilities
//! - 1.0.0: Initial creation with config module

pub mod config;
pub mod response;

// Re-export commonly used items
pub use config::{Config, PushConfig, StoreBackend};
pub use response::{
    chunk_for_push, chunk_text, truncate_chars, PUSH_MESSAGE_LIMIT, PUSH_TEXT_LIMIT,
};
