//! Jobhound LLM - provider abstraction for qualification scoring.
//!
//! This crate provides a single [`LlmProvider`] trait with Anthropic, `OpenAI`
//! and Ollama backends, plus [`build_provider`] which picks one from
//! configuration.
//!
//! # Example
//!
//! ```rust
//! use jobhound_core::LlmConfig;
//! use jobhound_llm::build_provider;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // "none" disables scoring entirely
//! let provider = build_provider(&LlmConfig::default(), 60)?;
//! assert!(provider.is_none());
//!
//! let config = LlmConfig {
//!     provider: "ollama".to_string(),
//!     model: Some("qwen2.5:7b".to_string()),
//!     ..LlmConfig::default()
//! };
//! let provider = build_provider(&config, 60)?.expect("ollama needs no key");
//! assert_eq!(provider.model(), "qwen2.5:7b");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod provider;
#[allow(missing_docs)]
pub mod providers;

use jobhound_core::LlmConfig;
use std::sync::Arc;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use provider::{Completion, LlmProvider, Prompt};
pub use providers::{AnthropicProvider, OllamaProvider, OpenAiProvider};

/// Build the provider named in configuration.
///
/// Returns `Ok(None)` for `provider = "none"`. Cloud backends need
/// `config.api_key`, which only ever comes from the environment.
pub fn build_provider(
    config: &LlmConfig,
    timeout_secs: u64,
) -> Result<Option<Arc<dyn LlmProvider>>> {
    let model = |default: &str| config.model.clone().unwrap_or_else(|| default.to_string());

    let provider: Arc<dyn LlmProvider> = match config.provider.as_str() {
        "none" => return Ok(None),
        "anthropic" => {
            let key = api_key(config, "ANTHROPIC_API_KEY")?;
            let mut provider =
                AnthropicProvider::with_model(key, model(providers::anthropic::DEFAULT_MODEL))?
                    .with_timeout(timeout_secs)?;
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            Arc::new(provider)
        }
        "openai" => {
            let key = api_key(config, "OPENAI_API_KEY")?;
            let mut provider =
                OpenAiProvider::with_model(key, model(providers::openai::DEFAULT_MODEL))?
                    .with_timeout(timeout_secs)?;
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url.as_str());
            }
            Arc::new(provider)
        }
        "ollama" => {
            let url = config.base_url.as_deref().unwrap_or(providers::ollama::DEFAULT_URL);
            Arc::new(
                OllamaProvider::with_url(url, model(providers::ollama::DEFAULT_MODEL))?
                    .with_timeout(timeout_secs)?,
            )
        }
        other => return Err(LlmError::UnknownProvider(other.to_string())),
    };

    tracing::info!(
        provider = provider.provider_id(),
        model = provider.model(),
        "LLM provider configured"
    );
    Ok(Some(provider))
}

fn api_key(config: &LlmConfig, env_var: &str) -> Result<String> {
    match config.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(LlmError::MissingApiKey {
            provider: config.provider.clone(),
            env_var: env_var.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_provider() {
        let provider = build_provider(&LlmConfig::default(), 60).expect("build");
        assert!(provider.is_none());
    }

    #[test]
    fn test_cloud_provider_requires_key() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_provider(&config, 60),
            Err(LlmError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_openai_with_key_and_default_model() {
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        let provider = build_provider(&config, 30).expect("build").expect("some");
        assert_eq!(provider.provider_id(), "openai");
        assert_eq!(provider.model(), providers::openai::DEFAULT_MODEL);
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "gemini".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            build_provider(&config, 60),
            Err(LlmError::UnknownProvider(name)) if name == "gemini"
        ));
    }
}
