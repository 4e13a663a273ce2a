//! The completion seam every backend implements.

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one prompt to completion.
    async fn complete(&self, prompt: &Prompt) -> Result<Completion>;

    /// Stable backend name (`anthropic`, `openai`, `ollama`).
    fn provider_id(&self) -> &str;

    /// Model the backend sends requests to.
    fn model(&self) -> &str;
}

/// A single system + user exchange.
///
/// Scoring never carries conversation history, so there is no message list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prompt {
    /// Instructions
    pub system: String,
    /// The material to judge
    pub user: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Ask the backend to constrain output to one JSON object where it can
    pub json_output: bool,
}

impl Prompt {
    /// Prompt with conservative sampling: 1024 tokens at temperature 0.2.
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 1024,
            temperature: 0.2,
            json_output: false,
        }
    }

    /// Override the token limit and temperature.
    #[must_use]
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Request JSON-object output.
    #[must_use]
    pub fn expect_json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Text a backend produced for a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text, text blocks joined
    pub text: String,
    /// Model that answered, as reported by the backend
    pub model: String,
    /// Generation stopped at the token limit
    pub truncated: bool,
}
