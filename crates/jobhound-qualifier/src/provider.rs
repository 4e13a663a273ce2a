//! Scoring provider seam and the LLM-backed implementation.

use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use jobhound_llm::{LlmProvider, Prompt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input to one scoring call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRequest {
    /// Plain-text rendering of the listing
    pub listing_text: String,
    /// Candidate profile summary
    pub profile_text: String,
    /// Optional resume text
    pub resume_text: Option<String>,
}

/// Parsed provider answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResponse {
    /// Fit score, 0-100
    pub score: u8,
    /// Provider explanation, kept verbatim
    pub reasoning: String,
}

/// Anything that can turn a [`ScoringRequest`] into a score.
#[async_trait]
pub trait ScoringProvider: Send + Sync {
    /// Score one listing against the candidate.
    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

const SYSTEM_PROMPT: &str = "You are an experienced technical recruiter. \
Rate how well the candidate fits the job on a scale from 0 to 100, where 100 \
is a perfect match. Consider required skills, seniority, location and work \
arrangement. Respond with a single JSON object of the form \
{\"score\": <integer 0-100>, \"reasoning\": \"<two or three sentences>\"} \
and nothing else.";

/// [`ScoringProvider`] backed by any [`LlmProvider`].
pub struct LlmScoringProvider {
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl LlmScoringProvider {
    /// Wrap an LLM provider.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    /// Override completion limits.
    #[must_use]
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    fn prompt(&self, request: &ScoringRequest) -> Prompt {
        Prompt::new(SYSTEM_PROMPT, build_user_prompt(request))
            .with_sampling(self.max_tokens, self.temperature)
            .expect_json()
    }
}

#[async_trait]
impl ScoringProvider for LlmScoringProvider {
    async fn score(&self, request: &ScoringRequest) -> Result<ScoringResponse> {
        let completion = self.llm.complete(&self.prompt(request)).await?;
        tracing::debug!(
            provider = self.llm.provider_id(),
            model = %completion.model,
            truncated = completion.truncated,
            "received scoring response"
        );
        parse_scoring_response(&completion.text)
    }

    fn name(&self) -> &str {
        self.llm.provider_id()
    }
}

fn build_user_prompt(request: &ScoringRequest) -> String {
    let mut prompt = String::from("## Job listing\n");
    prompt.push_str(request.listing_text.trim());
    prompt.push_str("\n\n## Candidate profile\n");
    prompt.push_str(request.profile_text.trim());
    if let Some(resume) = request.resume_text.as_deref().filter(|r| !r.trim().is_empty()) {
        prompt.push_str("\n\n## Resume\n");
        prompt.push_str(resume.trim());
    }
    prompt
}

static JSON_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex is valid"));

#[derive(Deserialize)]
struct RawScore {
    score: serde_json::Value,
    #[serde(default)]
    reasoning: String,
}

/// Parse a provider reply into a [`ScoringResponse`].
///
/// Accepts bare JSON, JSON inside a markdown fence, or JSON surrounded by
/// prose. Scores may be integers, floats or numeric strings; anything outside
/// 0-100 is rejected.
pub fn parse_scoring_response(content: &str) -> Result<ScoringResponse> {
    let object = JSON_OBJECT
        .find(content)
        .map(|m| m.as_str())
        .ok_or_else(|| ProviderError::Malformed("no JSON object in response".to_string()))?;

    let raw: RawScore = serde_json::from_str(object)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON: {e}")))?;

    let score = match &raw.score {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ProviderError::Malformed(format!("score is not numeric: {}", raw.score)))?;

    if !(0.0..=100.0).contains(&score) {
        return Err(ProviderError::Malformed(format!(
            "score {score} outside 0-100"
        )));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = score.round() as u8;

    Ok(ScoringResponse {
        score,
        reasoning: raw.reasoning,
    })
}
