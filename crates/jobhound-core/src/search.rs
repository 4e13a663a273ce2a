//! Search requests, filter specifications and per-session state.

use crate::error::{CoreError, Result};
use crate::types::{ExperienceLevel, JobType, Timestamp, WorkArrangement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kinds of search filter the UI exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Posting age window
    DatePosted,
    /// Remote / hybrid / on-site
    WorkArrangement,
    /// Seniority
    ExperienceLevel,
    /// Employment type
    JobType,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DatePosted => "date_posted",
            Self::WorkArrangement => "work_arrangement",
            Self::ExperienceLevel => "experience_level",
            Self::JobType => "job_type",
        };
        f.write_str(name)
    }
}

/// The value requested for a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterValue {
    /// Posted within the last N days
    DatePosted(u32),
    /// Work arrangement
    WorkArrangement(WorkArrangement),
    /// Seniority
    ExperienceLevel(ExperienceLevel),
    /// Employment type
    JobType(JobType),
}

impl FilterValue {
    /// Filter kind this value belongs to.
    #[must_use]
    pub fn kind(&self) -> FilterKind {
        match self {
            Self::DatePosted(_) => FilterKind::DatePosted,
            Self::WorkArrangement(_) => FilterKind::WorkArrangement,
            Self::ExperienceLevel(_) => FilterKind::ExperienceLevel,
            Self::JobType(_) => FilterKind::JobType,
        }
    }

    /// Human-readable label as the filter UI shows it.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::DatePosted(1) => "Past 24 hours".to_string(),
            Self::DatePosted(7) => "Past week".to_string(),
            Self::DatePosted(30) => "Past month".to_string(),
            Self::DatePosted(days) => format!("Past {days} days"),
            Self::WorkArrangement(a) => a.label().to_string(),
            Self::ExperienceLevel(l) => l.label().to_string(),
            Self::JobType(t) => t.label().to_string(),
        }
    }

    /// Short value code used by the filter controls' form inputs.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::DatePosted(days) => format!("r{}", u64::from(*days) * 86_400),
            Self::WorkArrangement(a) => match a {
                WorkArrangement::OnSite => "1",
                WorkArrangement::Remote => "2",
                WorkArrangement::Hybrid => "3",
            }
            .to_string(),
            Self::ExperienceLevel(l) => match l {
                ExperienceLevel::Internship => "1",
                ExperienceLevel::EntryLevel => "2",
                ExperienceLevel::Associate => "3",
                ExperienceLevel::MidSenior => "4",
                ExperienceLevel::Director => "5",
                ExperienceLevel::Executive => "6",
            }
            .to_string(),
            Self::JobType(t) => match t {
                JobType::FullTime => "F",
                JobType::PartTime => "P",
                JobType::Contract => "C",
                JobType::Temporary => "T",
                JobType::Internship => "I",
                JobType::Volunteer => "V",
            }
            .to_string(),
        }
    }

    /// Substitute `{label}`, `{code}` and `{days}` placeholders in a selector template.
    #[must_use]
    pub fn render(&self, template: &str) -> String {
        let days = match self {
            Self::DatePosted(days) => days.to_string(),
            _ => String::new(),
        };
        template
            .replace("{label}", &self.label())
            .replace("{code}", &self.code())
            .replace("{days}", &days)
    }
}

/// Whether a filter has been applied.
///
/// Transitions only forward: `NotAttempted` to `Applied` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppliedState {
    /// Not yet attempted
    NotAttempted,
    /// Verified as active in the UI
    Applied,
    /// Could not be applied; scraping continues without it
    Failed,
}

/// A filter to apply through the UI.
///
/// Immutable after construction except for its applied state, which only
/// moves forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    value: FilterValue,
    selector_candidates: Vec<String>,
    applied_state: AppliedState,
}

impl FilterSpec {
    /// Create a filter for a value with no explicit selector candidates.
    #[must_use]
    pub fn new(value: FilterValue) -> Self {
        Self {
            value,
            selector_candidates: Vec::new(),
            applied_state: AppliedState::NotAttempted,
        }
    }

    /// Posted within the last `days` days.
    #[must_use]
    pub fn date_posted(days: u32) -> Self {
        Self::new(FilterValue::DatePosted(days))
    }

    /// Work arrangement filter.
    #[must_use]
    pub fn work_arrangement(arrangement: WorkArrangement) -> Self {
        Self::new(FilterValue::WorkArrangement(arrangement))
    }

    /// Seniority filter.
    #[must_use]
    pub fn experience_level(level: ExperienceLevel) -> Self {
        Self::new(FilterValue::ExperienceLevel(level))
    }

    /// Employment type filter.
    #[must_use]
    pub fn job_type(job_type: JobType) -> Self {
        Self::new(FilterValue::JobType(job_type))
    }

    /// Attach ordered selector candidates for the filter option.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.selector_candidates = candidates;
        self
    }

    /// Filter kind.
    #[must_use]
    pub fn kind(&self) -> FilterKind {
        self.value.kind()
    }

    /// Requested value.
    #[must_use]
    pub fn value(&self) -> FilterValue {
        self.value
    }

    /// Ordered option selector candidates.
    #[must_use]
    pub fn selector_candidates(&self) -> &[String] {
        &self.selector_candidates
    }

    /// Current applied state.
    #[must_use]
    pub fn applied_state(&self) -> AppliedState {
        self.applied_state
    }

    /// Record that the filter was verified as active.
    pub fn mark_applied(&mut self) -> Result<()> {
        self.advance(AppliedState::Applied)
    }

    /// Record that the filter could not be applied.
    pub fn mark_failed(&mut self) -> Result<()> {
        self.advance(AppliedState::Failed)
    }

    fn advance(&mut self, to: AppliedState) -> Result<()> {
        if self.applied_state != AppliedState::NotAttempted {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", self.applied_state),
                to: format!("{to:?}"),
            });
        }
        self.applied_state = to;
        Ok(())
    }
}

/// Candidate data supplied by the caller for qualification scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Free-text profile summary (skills, preferences, experience)
    pub profile_text: String,
    /// Optional resume text
    pub resume_text: Option<String>,
}

impl CandidateProfile {
    /// Create a profile from its summary text.
    #[must_use]
    pub fn new(profile_text: impl Into<String>) -> Self {
        Self {
            profile_text: profile_text.into(),
            resume_text: None,
        }
    }

    /// Attach resume text.
    #[must_use]
    pub fn with_resume(mut self, resume_text: impl Into<String>) -> Self {
        self.resume_text = Some(resume_text.into());
        self
    }
}

/// Entry request for one scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Search keywords
    pub keywords: String,
    /// Search location
    pub location: String,
    /// Filters to apply through the UI
    pub filters: Vec<FilterSpec>,
    /// Maximum number of listings to collect
    pub max_jobs: usize,
    /// Optional wall-clock budget for the whole session
    #[serde(default, with = "optional_secs")]
    pub deadline: Option<Duration>,
}

impl ScrapeRequest {
    /// Create a request with no filters and a default job cap of 25.
    #[must_use]
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            location: location.into(),
            filters: Vec::new(),
            max_jobs: 25,
            deadline: None,
        }
    }

    /// Add a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the job cap.
    #[must_use]
    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = max_jobs;
        self
    }

    /// Set a deadline for the whole session.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Reject requests that cannot produce a meaningful scrape.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.trim().is_empty() {
            return Err(CoreError::Validation(
                "keywords must not be empty".to_string(),
            ));
        }
        if self.max_jobs == 0 {
            return Err(CoreError::Validation(
                "max_jobs must be at least 1".to_string(),
            ));
        }
        if let Some(days) = self.filters.iter().find_map(|f| match f.value() {
            FilterValue::DatePosted(days) => Some(days),
            _ => None,
        }) {
            if days == 0 {
                return Err(CoreError::Validation(
                    "date_posted window must be at least 1 day".to_string(),
                ));
            }
        }
        let mut kinds: Vec<_> = self.filters.iter().map(FilterSpec::kind).collect();
        let total = kinds.len();
        kinds.sort_by_key(|k| *k as u8);
        kinds.dedup();
        if kinds.len() != total {
            return Err(CoreError::Validation(
                "each filter kind may be requested at most once".to_string(),
            ));
        }
        Ok(())
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

/// Lifecycle of one search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Created, no browser work yet
    Idle,
    /// Opening the search page
    Navigating,
    /// Applying filters through the UI
    FilterApplying,
    /// Walking result cards
    Scraping,
    /// Waiting for a human to resolve a challenge
    Paused,
    /// Finished normally
    Completed,
    /// Terminated by a session-level failure
    Failed,
}

impl SessionState {
    /// Whether the session has ended.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// State owned by the orchestrator for the lifetime of one scrape.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSession {
    id: uuid::Uuid,
    keywords: String,
    location: String,
    requested_filters: Vec<FilterSpec>,
    state: SessionState,
    resume_to: Option<SessionState>,
    page_cursor: u32,
    started_at: Timestamp,
}

impl SearchSession {
    /// Start a session for a request.
    #[must_use]
    pub fn new(request: &ScrapeRequest) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            keywords: request.keywords.clone(),
            location: request.location.clone(),
            requested_filters: request.filters.clone(),
            state: SessionState::Idle,
            resume_to: None,
            page_cursor: 0,
            started_at: Timestamp::now(),
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    /// Search keywords.
    #[must_use]
    pub fn keywords(&self) -> &str {
        &self.keywords
    }

    /// Search location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Filters requested for this session.
    #[must_use]
    pub fn requested_filters(&self) -> &[FilterSpec] {
        &self.requested_filters
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Zero-based index of the current result page.
    #[must_use]
    pub fn page_cursor(&self) -> u32 {
        self.page_cursor
    }

    /// When the session started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Move to the next result page.
    pub fn advance_page(&mut self) {
        self.page_cursor += 1;
    }

    /// Move to a new state, rejecting transitions the lifecycle forbids.
    pub fn transition(&mut self, to: SessionState) -> Result<()> {
        use SessionState::{
            Completed, Failed, FilterApplying, Idle, Navigating, Paused, Scraping,
        };

        let allowed = match (self.state, to) {
            (_, Failed) => !self.state.is_terminal(),
            (Idle, Navigating)
            | (Navigating, FilterApplying | Scraping | Paused)
            | (FilterApplying, Scraping | Paused)
            | (Scraping, Paused | Completed) => true,
            (Paused, next) => Some(next) == self.resume_to,
            _ => false,
        };

        if !allowed {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", self.state),
                to: format!("{to:?}"),
            });
        }

        if to == Paused {
            self.resume_to = Some(self.state);
        } else {
            self.resume_to = None;
        }
        tracing::debug!(session = %self.id, from = ?self.state, to = ?to, "session transition");
        self.state = to;
        Ok(())
    }

    /// Pause for a challenge, remembering where to resume.
    pub fn pause(&mut self) -> Result<()> {
        self.transition(SessionState::Paused)
    }

    /// Resume the state that was active before pausing.
    pub fn resume(&mut self) -> Result<()> {
        let to = self.resume_to.ok_or_else(|| CoreError::InvalidTransition {
            from: format!("{:?}", self.state),
            to: "resume".to_string(),
        })?;
        self.transition(to)
    }
}
