//! Local models through an Ollama server's chat endpoint.

use super::http::{ChatMessage, HttpBackend};
use crate::error::Result;
use crate::provider::{Completion, LlmProvider, Prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "ollama";

/// Default server address.
pub const DEFAULT_URL: &str = "http://localhost:11434";

/// Default local model.
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

// First request after a model load is slow
const LOCAL_TIMEOUT_SECS: u64 = 120;

/// Ollama backend. Needs no credentials.
pub struct OllamaProvider {
    model: String,
    base_url: String,
    http: HttpBackend,
}

impl OllamaProvider {
    pub fn with_url(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: HttpBackend::new(PROVIDER, LOCAL_TIMEOUT_SECS)?,
        })
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.http = self.http.with_timeout(timeout_secs)?;
        Ok(self)
    }

    fn body(&self, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: ChatMessage::pair(&prompt.system, &prompt.user),
            stream: false,
            format: prompt.json_output.then_some("json"),
            options: Options {
                temperature: prompt.temperature,
                num_predict: prompt.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion> {
        let request = self
            .http
            .post(&format!("{}/api/chat", self.base_url))
            .json(&self.body(prompt));
        let response: ChatResponse = self.http.send(request).await?;
        Ok(Completion {
            text: response.message.content,
            model: response.model,
            truncated: response.done_reason.as_deref() == Some("length"),
        })
    }

    fn provider_id(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatMessage,
    done_reason: Option<String>,
}
