//! HTTP plumbing shared by the backends: client construction, error
//! classification and JSON decoding.

use crate::error::{LlmError, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request timeout for hosted APIs.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// A `reqwest` client tagged with the backend it serves.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    provider: &'static str,
    client: Client,
    timeout_secs: u64,
}

impl HttpBackend {
    pub fn new(provider: &'static str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            provider,
            client,
            timeout_secs,
        })
    }

    /// Rebuild the client with a different timeout.
    pub fn with_timeout(self, timeout_secs: u64) -> Result<Self> {
        Self::new(self.provider, timeout_secs)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send, reject non-success statuses and decode the JSON body.
    pub async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(provider = self.provider, status = status.as_u16(), "LLM request rejected");
            return Err(classify_status(self.provider, status, body));
        }

        response.json().await.map_err(|e| LlmError::Malformed {
            provider: self.provider.to_string(),
            message: e.to_string(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout_secs,
            }
        } else if err.is_connect() {
            LlmError::Unreachable {
                provider: self.provider.to_string(),
                message: err.to_string(),
            }
        } else {
            LlmError::Transport(err)
        }
    }
}

/// Map a non-success status to an error.
#[must_use]
pub fn classify_status(provider: &str, status: StatusCode, body: String) -> LlmError {
    let provider = provider.to_string();
    match status {
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { provider, body },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized { provider, body },
        _ => LlmError::Status {
            provider,
            status: status.as_u16(),
            body,
        },
    }
}

/// `{role, content}` pair used by the OpenAI-style chat formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// System and user turns for a prompt, system first.
    pub fn pair(system: &str, user: &str) -> Vec<Self> {
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(Self {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(Self {
            role: "user".to_string(),
            content: user.to_string(),
        });
        messages
    }
}
