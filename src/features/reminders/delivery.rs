//! # Feature: Reminder Delivery
//!
//! Wraps the outbound push channel and turns its raw results into one of
//! three delivery outcomes. The quota heuristic lives in [`classify`] and
//! nowhere else.
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0
//! - **Toggleable**: false

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// HTTP status providers use for "too many requests" and exhausted monthly quotas
const QUOTA_STATUS: u16 = 429;

/// Error text that identifies quota exhaustion regardless of status code
static QUOTA_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)monthly\s+limit|quota|rate[\s_-]?limit|too\s+many\s+requests")
        .expect("quota marker pattern is valid")
});

/// Structured failure reported by a push channel
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("push failed (status {status:?}): {message}")]
pub struct PushError {
    /// Transport status code, when the provider answered at all
    pub status: Option<u16>,
    pub message: String,
}

impl PushError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Outbound messaging channel: `push(owner_id, text)`
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn push(&self, owner_id: &str, text: &str) -> Result<(), PushError>;
}

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    /// Anything not recognised as quota exhaustion; worth retrying
    TransientFailure(String),
    /// Provider refused on quota; terminal for the reminder
    QuotaExceeded(String),
}

impl std::fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryOutcome::Success => write!(f, "success"),
            DeliveryOutcome::TransientFailure(reason) => write!(f, "transient failure: {reason}"),
            DeliveryOutcome::QuotaExceeded(reason) => write!(f, "quota exceeded: {reason}"),
        }
    }
}

/// Classify a raw push result
///
/// Best-effort over an opaque provider error surface: a 429 status or any
/// quota/rate-limit wording in the message counts as quota exhaustion.
pub fn classify(result: &Result<(), PushError>) -> DeliveryOutcome {
    match result {
        Ok(()) => DeliveryOutcome::Success,
        Err(e) if e.status == Some(QUOTA_STATUS) || QUOTA_MARKERS.is_match(&e.message) => {
            DeliveryOutcome::QuotaExceeded(e.to_string())
        }
        Err(e) => DeliveryOutcome::TransientFailure(e.to_string()),
    }
}

/// Sends reminder text through a [`PushChannel`] and classifies the result
#[derive(Clone)]
pub struct DeliveryClient {
    channel: Arc<dyn PushChannel>,
}

impl DeliveryClient {
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self { channel }
    }

    pub async fn deliver(&self, owner_id: &str, text: &str) -> DeliveryOutcome {
        let result = self.channel.push(owner_id, text).await;
        classify(&result)
    }
}
