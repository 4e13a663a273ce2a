//! Jobhound Qualifier - scores extracted listings against a candidate.
//!
//! [`QualificationScorer`] turns a [`JobListing`](jobhound_core::JobListing)
//! and a [`CandidateProfile`](jobhound_core::CandidateProfile) into a
//! [`QualificationResult`](jobhound_core::QualificationResult), retrying
//! transient provider failures and degrading to `Unscored` instead of
//! failing. [`ScoringPool`] runs the scorer on a bounded number of concurrent
//! calls so scoring overlaps with scraping.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod pool;
pub mod provider;
pub mod scorer;

pub use error::{ProviderError, Result};
pub use pool::ScoringPool;
pub use provider::{
    parse_scoring_response, LlmScoringProvider, ScoringProvider, ScoringRequest, ScoringResponse,
};
pub use scorer::QualificationScorer;

use jobhound_core::AppConfig;
use std::sync::Arc;

/// Build a scorer from application config.
///
/// The LLM provider is chosen by `[llm]`; `provider = "none"` yields a
/// scorer that marks every listing `Unscored`.
pub fn scorer_from_config(config: &AppConfig) -> jobhound_llm::Result<QualificationScorer> {
    let llm = jobhound_llm::build_provider(&config.llm, config.qualification.request_timeout_secs)?;
    let provider = llm.map(|llm| {
        Arc::new(
            LlmScoringProvider::new(llm).with_sampling(config.llm.max_tokens, config.llm.temperature),
        ) as Arc<dyn ScoringProvider>
    });
    Ok(QualificationScorer::from_config(
        provider,
        &config.qualification,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_from_default_config_is_disabled() {
        let scorer = scorer_from_config(&AppConfig::default()).expect("build scorer");
        assert!(!scorer.is_enabled());
        assert_eq!(scorer.bands().highly_qualified, 85);
    }

    #[test]
    fn test_scorer_from_ollama_config_is_enabled() {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        let scorer = scorer_from_config(&config).expect("build scorer");
        assert!(scorer.is_enabled());
    }
}
