//! `OpenAI` chat completions, and compatible gateways via a base URL.

use super::http::{ChatMessage, HttpBackend, DEFAULT_TIMEOUT_SECS};
use crate::error::{LlmError, Result};
use crate::provider::{Completion, LlmProvider, Prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "openai";

/// Default scoring model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// `OpenAI` backend.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    http: HttpBackend,
}

impl OpenAiProvider {
    /// Backend for `model`, authenticated with `api_key`.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            http: HttpBackend::new(PROVIDER, DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Point at an OpenAI-compatible gateway.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Result<Self> {
        self.http = self.http.with_timeout(timeout_secs)?;
        Ok(self)
    }

    fn body(&self, prompt: &Prompt) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: ChatMessage::pair(&prompt.system, &prompt.user),
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            response_format: prompt.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion> {
        let request = self
            .http
            .post(&format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.body(prompt));
        let response: ChatResponse = self.http.send(request).await?;
        response.into_completion()
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
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(LlmError::Malformed {
                provider: PROVIDER.to_string(),
                message: "response has no choices".to_string(),
            });
        };
        Ok(Completion {
            text: choice.message.content,
            model: self.model,
            truncated: choice.finish_reason.as_deref() == Some("length"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_sets_response_format() {
        let provider = OpenAiProvider::with_model("sk-test", DEFAULT_MODEL).expect("client");
        let prompt = Prompt::new("You are a recruiter", "Score this listing").expect_json();
        let json = serde_json::to_value(provider.body(&prompt)).expect("serialize");

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Score this listing");
        assert_eq!(json["response_format"]["type"], "json_object");

        let json = serde_json::to_value(provider.body(&Prompt::new("s", "u"))).expect("serialize");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_length_finish_is_truncated() {
        let raw = r#"{
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{"message": {"role": "assistant", "content": "{\"score\": 5"}, "finish_reason": "length"}]
        }"#;
        let response: ChatResponse = serde_json::from_str(raw).expect("parse");
        let completion = response.into_completion().expect("completion");
        assert!(completion.truncated);
        assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
    }

    #[test]
    fn test_no_choices_is_malformed() {
        let response = ChatResponse {
            model: DEFAULT_MODEL.to_string(),
            choices: Vec::new(),
        };
        assert!(matches!(
            response.into_completion(),
            Err(LlmError::Malformed { .. })
        ));
    }
}
