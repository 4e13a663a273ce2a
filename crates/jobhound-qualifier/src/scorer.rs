//! Qualification scoring with bounded retries.

use crate::error::ProviderError;
use crate::provider::{ScoringProvider, ScoringRequest};
use jobhound_core::{
    CandidateProfile, JobListing, QualificationBands, QualificationConfig, QualificationResult,
    RetryPolicy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Scores listings against a candidate profile.
///
/// Never fails: a missing provider, a non-transient provider error or
/// exhausted retries all produce an `Unscored` result.
#[derive(Clone)]
pub struct QualificationScorer {
    provider: Option<Arc<dyn ScoringProvider>>,
    retry: RetryPolicy,
    bands: QualificationBands,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl QualificationScorer {
    /// Create a scorer. `None` disables scoring.
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn ScoringProvider>>,
        retry: RetryPolicy,
        bands: QualificationBands,
    ) -> Self {
        Self {
            provider,
            retry,
            bands,
            request_timeout: Duration::from_secs(60),
            cancel: CancellationToken::new(),
        }
    }

    /// Create a scorer from the `[qualification]` config section.
    #[must_use]
    pub fn from_config(
        provider: Option<Arc<dyn ScoringProvider>>,
        config: &QualificationConfig,
    ) -> Self {
        Self::new(provider, config.retry_policy(), config.bands())
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    /// Bound a single provider call.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Abort pending retries when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Whether a provider is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Score bands in use.
    #[must_use]
    pub fn bands(&self) -> &QualificationBands {
        &self.bands
    }

    /// Score one listing.
    pub async fn score(
        &self,
        listing: &JobListing,
        profile: &CandidateProfile,
    ) -> QualificationResult {
        let job_id = listing.id().clone();
        let Some(provider) = &self.provider else {
            return QualificationResult::unscored(job_id, "no scoring provider configured", 0);
        };
        if self.cancel.is_cancelled() {
            return QualificationResult::unscored(job_id, "scoring cancelled", 0);
        }

        let request = ScoringRequest {
            listing_text: listing.to_prompt_text(),
            profile_text: profile.profile_text.clone(),
            resume_text: profile.resume_text.clone(),
        };
        let timeout = self.request_timeout;

        let outcome = self
            .retry
            .run(Some(&self.cancel), ProviderError::is_transient, |attempt| {
                let provider = Arc::clone(provider);
                let request = &request;
                let job_id = &job_id;
                async move {
                    debug!(job_id = %job_id, attempt, provider = provider.name(), "scoring listing");
                    match tokio::time::timeout(timeout, provider.score(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout {
                            seconds: timeout.as_secs(),
                        }),
                    }
                }
            })
            .await;

        match outcome.result {
            Ok(response) => {
                let result = QualificationResult::scored(
                    job_id,
                    response.score,
                    response.reasoning,
                    outcome.failures,
                    &self.bands,
                );
                info!(
                    job_id = %result.job_id,
                    score = response.score,
                    status = ?result.status,
                    retries = outcome.failures,
                    "listing scored"
                );
                result
            }
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    failures = outcome.failures,
                    "scoring gave up: {e}"
                );
                QualificationResult::unscored(job_id, e.to_string(), outcome.failures)
            }
        }
    }
}
