//! Scoring through a scripted LLM provider.

use async_trait::async_trait;
use jobhound_core::{
    CandidateProfile, JobListing, ListingParts, QualificationBands, QualificationStatus,
    RetryPolicy,
};
use jobhound_llm::{Completion, LlmError, LlmProvider, Prompt};
use jobhound_qualifier::{LlmScoringProvider, QualificationScorer, ScoringPool, ScoringProvider};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replies with queued results, then repeats the last one.
struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &Prompt) -> jobhound_llm::Result<Completion> {
        self.prompts.lock().unwrap().push(prompt.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::Unreachable {
                    provider: "scripted".to_string(),
                    message: "script exhausted".to_string(),
                })
            });
        reply.map(|text| Completion {
            text,
            model: "scripted".to_string(),
            truncated: false,
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

fn listing() -> JobListing {
    JobListing::new(ListingParts {
        listing_url: Some("https://jobs.example.com/view/99".to_string()),
        title: "Senior Rust Engineer".to_string(),
        company: "Ferrous Systems".to_string(),
        location: Some("Berlin".to_string()),
        description_raw: Some("Build async network services in Rust.".to_string()),
        ..ListingParts::default()
    })
}

fn scorer(llm: Arc<ScriptedLlm>) -> QualificationScorer {
    let provider: Arc<dyn ScoringProvider> = Arc::new(LlmScoringProvider::new(llm));
    QualificationScorer::new(
        Some(provider),
        RetryPolicy::exponential(3, Duration::from_millis(200)),
        QualificationBands::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn rate_limit_then_malformed_then_score() {
    let llm = ScriptedLlm::new(vec![
        Err(LlmError::RateLimited {
            provider: "scripted".to_string(),
            body: "slow down".to_string(),
        }),
        Ok("Sure! The candidate looks good.".to_string()),
        Ok(r#"```json
{"score": 74, "reasoning": "Solid Rust, little networking."}
```"#
            .to_string()),
    ]);

    let profile = CandidateProfile::new("Five years of Rust").with_resume("Resume text");
    let result = scorer(Arc::clone(&llm)).score(&listing(), &profile).await;

    assert_eq!(result.score, Some(74));
    assert_eq!(result.status, QualificationStatus::Qualified);
    assert_eq!(result.reasoning, "Solid Rust, little networking.");
    assert_eq!(result.retry_count, 2);

    let prompts = llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].json_output);
    assert!(prompts[0].system.contains("0 to 100"));
    let user = &prompts[0].user;
    assert!(user.contains("Senior Rust Engineer"));
    assert!(user.contains("Five years of Rust"));
    assert!(user.contains("## Resume\nResume text"));
}

#[tokio::test(start_paused = true)]
async fn authentication_failure_is_unscored_without_retry() {
    let llm = ScriptedLlm::new(vec![Err(LlmError::Unauthorized {
        provider: "scripted".to_string(),
        body: "invalid x-api-key".to_string(),
    })]);

    let result = scorer(Arc::clone(&llm))
        .score(&listing(), &CandidateProfile::new("Rust"))
        .await;

    assert_eq!(result.status, QualificationStatus::Unscored);
    assert_eq!(result.retry_count, 1);
    assert_eq!(llm.prompts.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pool_degrades_single_job_only() {
    let llm = ScriptedLlm::new(vec![
        Ok(r#"{"score": 90, "reasoning": "Great fit."}"#.to_string()),
        Err(LlmError::Unreachable {
            provider: "scripted".to_string(),
            message: "connection refused".to_string(),
        }),
    ]);

    // One worker keeps the script order deterministic
    let mut pool = ScoringPool::spawn(scorer(llm), CandidateProfile::new("Rust"), 1);
    let first = listing();
    let second = JobListing::new(ListingParts {
        listing_url: Some("https://jobs.example.com/view/100".to_string()),
        title: "Platform Engineer".to_string(),
        company: "Acme".to_string(),
        ..ListingParts::default()
    });
    pool.submit(first.clone());
    pool.submit(second.clone());

    let results = pool.finish().await;
    assert_eq!(results.len(), 2);
    assert_eq!(&results[0].job_id, first.id());
    assert_eq!(results[0].status, QualificationStatus::HighlyQualified);
    assert_eq!(&results[1].job_id, second.id());
    assert_eq!(results[1].status, QualificationStatus::Unscored);
}
