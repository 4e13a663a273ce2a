//! Anthropic Messages API.

use super::http::{HttpBackend, DEFAULT_TIMEOUT_SECS};
use crate::error::Result;
use crate::provider::{Completion, LlmProvider, Prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

/// Default scoring model.
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Anthropic backend.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    http: HttpBackend,
}

impl AnthropicProvider {
    /// Backend for `model`, authenticated with `api_key`.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            http: HttpBackend::new(PROVIDER, DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Point at a proxy or mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.http = self.http.with_timeout(timeout_secs)?;
        Ok(self)
    }

    fn body<'a>(&'a self, prompt: &'a Prompt) -> MessagesRequest<'a> {
        // The Messages API has no JSON mode; the system prompt carries the format
        MessagesRequest {
            model: &self.model,
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            system: Some(prompt.system.as_str()).filter(|s| !s.trim().is_empty()),
            messages: [UserTurn {
                role: "user",
                content: &prompt.user,
            }],
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion> {
        let request = self
            .http
            .post(&format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(prompt));
        let response: MessagesResponse = self.http.send(request).await?;
        Ok(response.into_completion())
    }

    fn provider_id(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [UserTurn<'a>; 1],
}

#[derive(Serialize)]
struct UserTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<Block>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn into_completion(self) -> Completion {
        let text = self
            .content
            .into_iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text),
                Block::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Completion {
            text,
            model: self.model,
            truncated: self.stop_reason.as_deref() == Some("max_tokens"),
        }
    }
}
