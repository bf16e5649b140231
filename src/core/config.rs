//! Environment configuration
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Explicit reminder store backend selection, push channel and scheduler settings
//! - 1.0.0: Initial env-based configuration

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

use crate::features::reminders::scheduler::{SchedulerSettings, DEFAULT_POLL_INTERVAL};

pub const DEFAULT_DATABASE_PATH: &str = "concierge.db";
pub const DEFAULT_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Which reminder store to open. Chosen explicitly, never inferred from a URL.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite { path: String },
    Postgres { url: String, max_connections: u32 },
}

impl std::fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            StoreBackend::Postgres {
                max_connections, ..
            } => f
                .debug_struct("Postgres")
                .field("url", &"<redacted>")
                .field("max_connections", max_connections)
                .finish(),
        }
    }
}

#[derive(Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub channel_token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("endpoint", &self.endpoint)
            .field("channel_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub store: StoreBackend,
    pub scheduler: SchedulerSettings,
    pub push: PushConfig,
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup (process env, a map in tests, ...)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_level = get("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let store = match get("REMINDER_STORE")
            .unwrap_or_else(|| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StoreBackend::Sqlite {
                path: get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            },
            "postgres" | "postgresql" => StoreBackend::Postgres {
                url: get("DATABASE_URL").ok_or_else(|| {
                    anyhow!("DATABASE_URL must be set when REMINDER_STORE=postgres")
                })?,
                max_connections: parse_or(
                    get("DATABASE_MAX_CONNECTIONS"),
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_MAX_CONNECTIONS,
                )?,
            },
            other => {
                return Err(anyhow!(
                    "Unknown REMINDER_STORE '{}' (expected 'sqlite' or 'postgres')",
                    other
                ))
            }
        };

        let poll_secs = parse_or(
            get("REMINDER_POLL_INTERVAL_SECS"),
            "REMINDER_POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL.as_secs(),
        )?;
        if poll_secs == 0 {
            return Err(anyhow!("REMINDER_POLL_INTERVAL_SECS must be greater than zero"));
        }

        let scheduler = SchedulerSettings {
            poll_interval: Duration::from_secs(poll_secs),
            skip_when_saturated: parse_bool(
                get("REMINDER_SKIP_WHEN_SATURATED"),
                "REMINDER_SKIP_WHEN_SATURATED",
            )?,
        };

        let timeout_secs = parse_or(
            get("PUSH_TIMEOUT_SECS"),
            "PUSH_TIMEOUT_SECS",
            DEFAULT_PUSH_TIMEOUT.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(anyhow!("PUSH_TIMEOUT_SECS must be greater than zero"));
        }

        let push = PushConfig {
            endpoint: get("PUSH_ENDPOINT").unwrap_or_else(|| DEFAULT_PUSH_ENDPOINT.to_string()),
            channel_token: get("PUSH_CHANNEL_TOKEN")
                .ok_or_else(|| anyhow!("PUSH_CHANNEL_TOKEN must be set"))?,
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            log_level,
            store,
            scheduler,
            push,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value '{value}'")),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{} has invalid boolean '{}'", key, v)),
        },
    }
}
