//! HTTP push channel
//!
//! Posts text messages to a push-messaging API with bearer authentication.
//! Request shape: `{"to": "<owner>", "messages": [{"type": "text", "text": "..."}]}`.
//!
//! - **Version**: 1.0.0
//! - **Since**: 4.7.0

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::response::chunk_for_push;
use crate::features::reminders::delivery::{PushChannel, PushError};

#[derive(Debug, Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage>,
}

/// Error body returned by the provider on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request<'a>(owner_id: &'a str, text: &str) -> PushRequest<'a> {
    PushRequest {
        to: owner_id,
        messages: chunk_for_push(text)
            .into_iter()
            .map(|text| TextMessage { kind: "text", text })
            .collect(),
    }
}

/// Pull the provider's `message` out of an error body, or fall back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// [`PushChannel`] backed by the provider's HTTP API
#[derive(Clone)]
pub struct HttpPushChannel {
    client: reqwest::Client,
    endpoint: String,
    token: String,
}

impl HttpPushChannel {
    pub fn new(endpoint: String, token: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint, token))
    }

    pub fn with_client(client: reqwest::Client, endpoint: String, token: String) -> Self {
        Self {
            client,
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    async fn push(&self, owner_id: &str, text: &str) -> Result<(), PushError> {
        let request = build_request(owner_id, text);
        debug!(
            "Pushing {} message(s) to {owner_id}",
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::new(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PushError::new(Some(status.as_u16()), error_message(&body)))
    }
}
