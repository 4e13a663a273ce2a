//! Results produced by a scrape: challenge events, qualification results,
//! statistics and the final aggregate handed to the persistence/UI layer.

use crate::listing::JobListing;
use crate::search::{AppliedState, FilterKind};
use crate::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};

/// Progress of a detected challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptchaStatus {
    /// Signature matched
    Detected,
    /// Pipeline paused, waiting for a human
    AwaitingManualResolution,
    /// A human signalled resolution and the page is clear
    Resolved,
    /// Resolution timed out or the session was cancelled
    Abandoned,
}

/// A challenge detected during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaEvent {
    detected_at: Timestamp,
    signature_matched: String,
    resolved_at: Option<Timestamp>,
    status: CaptchaStatus,
}

impl CaptchaEvent {
    /// Record a detection for the given signature.
    #[must_use]
    pub fn detected(signature: impl Into<String>) -> Self {
        Self {
            detected_at: Timestamp::now(),
            signature_matched: signature.into(),
            resolved_at: None,
            status: CaptchaStatus::Detected,
        }
    }

    /// When the challenge was detected.
    #[must_use]
    pub fn detected_at(&self) -> Timestamp {
        self.detected_at
    }

    /// The signature that matched.
    #[must_use]
    pub fn signature_matched(&self) -> &str {
        &self.signature_matched
    }

    /// When the challenge was resolved, if it was.
    #[must_use]
    pub fn resolved_at(&self) -> Option<Timestamp> {
        self.resolved_at
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> CaptchaStatus {
        self.status
    }

    /// Mark the event as waiting for a human.
    pub fn await_manual_resolution(&mut self) {
        if self.status == CaptchaStatus::Detected {
            self.status = CaptchaStatus::AwaitingManualResolution;
        }
    }

    /// Mark the event resolved. `resolved_at` never precedes `detected_at`.
    pub fn resolve(&mut self) {
        if matches!(
            self.status,
            CaptchaStatus::Detected | CaptchaStatus::AwaitingManualResolution
        ) {
            self.resolved_at = Some(Timestamp::now().max(self.detected_at));
            self.status = CaptchaStatus::Resolved;
        }
    }

    /// Mark the event abandoned.
    pub fn abandon(&mut self) {
        if matches!(
            self.status,
            CaptchaStatus::Detected | CaptchaStatus::AwaitingManualResolution
        ) {
            self.status = CaptchaStatus::Abandoned;
        }
    }
}

/// Qualification band for a scored listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualificationStatus {
    /// Score at or above the highly-qualified threshold
    HighlyQualified,
    /// Score at or above the qualified threshold
    Qualified,
    /// Score at or above the somewhat-qualified threshold
    SomewhatQualified,
    /// Score below every threshold
    NotQualified,
    /// No score could be obtained
    Unscored,
}

/// Thresholds mapping a 0-100 score to a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationBands {
    /// Lower bound for `HighlyQualified`
    pub highly_qualified: u8,
    /// Lower bound for `Qualified`
    pub qualified: u8,
    /// Lower bound for `SomewhatQualified`
    pub somewhat_qualified: u8,
}

impl Default for QualificationBands {
    fn default() -> Self {
        Self {
            highly_qualified: 85,
            qualified: 70,
            somewhat_qualified: 50,
        }
    }
}

impl QualificationBands {
    /// Band for a score.
    #[must_use]
    pub fn classify(&self, score: u8) -> QualificationStatus {
        if score >= self.highly_qualified {
            QualificationStatus::HighlyQualified
        } else if score >= self.qualified {
            QualificationStatus::Qualified
        } else if score >= self.somewhat_qualified {
            QualificationStatus::SomewhatQualified
        } else {
            QualificationStatus::NotQualified
        }
    }

    /// Whether the thresholds are strictly ordered and within 0-100.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.highly_qualified <= 100
            && self.highly_qualified > self.qualified
            && self.qualified > self.somewhat_qualified
    }
}

/// Qualification outcome for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    /// Listing this result refers to
    pub job_id: JobId,
    /// Score 0-100, absent when unscored
    pub score: Option<u8>,
    /// Band
    pub status: QualificationStatus,
    /// Provider reasoning, unmodified
    pub reasoning: String,
    /// Number of failed provider attempts
    pub retry_count: u32,
}

impl QualificationResult {
    /// A scored result, banded with `bands`.
    #[must_use]
    pub fn scored(
        job_id: JobId,
        score: u8,
        reasoning: String,
        retry_count: u32,
        bands: &QualificationBands,
    ) -> Self {
        let score = score.min(100);
        Self {
            job_id,
            score: Some(score),
            status: bands.classify(score),
            reasoning,
            retry_count,
        }
    }

    /// An unscored result.
    #[must_use]
    pub fn unscored(job_id: JobId, reasoning: impl Into<String>, retry_count: u32) -> Self {
        Self {
            job_id,
            score: None,
            status: QualificationStatus::Unscored,
            reasoning: reasoning.into(),
            retry_count,
        }
    }
}

/// How one filter ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Filter kind
    pub kind: FilterKind,
    /// Value label as requested
    pub requested: String,
    /// Final applied state
    pub state: AppliedState,
    /// Date window actually kept (date filters only)
    pub window_days: Option<u32>,
    /// Windows tried by the broadening policy, in order
    pub attempted_windows: Vec<u32>,
}

/// Counters for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Cards seen on result pages
    pub found: usize,
    /// Cards the extractor was run on
    pub processed: usize,
    /// Unique listings kept
    pub extracted: usize,
    /// Cards whose panel never loaded
    pub panel_failures: usize,
    /// Card-level errors
    pub errors: usize,
    /// Listings dropped as duplicates
    pub duplicates: usize,
    /// Listings the validation pass flagged
    pub flagged: usize,
    /// Result pages visited
    pub pages_visited: u32,
    /// Challenges detected
    pub captcha_events: usize,
    /// Per-filter outcomes
    pub filters: Vec<FilterReport>,
}

impl SessionStats {
    /// Filters that were attempted but not applied.
    #[must_use]
    pub fn failed_filters(&self) -> usize {
        self.filters
            .iter()
            .filter(|f| f.state == AppliedState::Failed)
            .count()
    }
}

/// Why a session terminated early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Navigation kept timing out
    NavigationTimeout {
        /// URL being opened
        url: String,
        /// Attempts made
        attempts: u32,
    },
    /// The site demanded credentials
    AuthenticationFailed {
        /// Where the login wall appeared
        url: String,
    },
    /// A challenge was not resolved in time
    CaptchaUnresolved {
        /// Signature that matched
        signature: String,
    },
    /// Cancelled by the caller or the deadline
    Cancelled,
    /// Unrecoverable browser failure
    Browser {
        /// Error message
        message: String,
    },
}

/// Terminal status of a scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    /// Finished by reaching the job cap or running out of pages
    Completed,
    /// Terminated by a session-level failure; results are partial
    Failed {
        /// Cause
        #[serde(flatten)]
        reason: FailureReason,
    },
}

/// The aggregate handed to the persistence/UI boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Session identifier
    pub session_id: uuid::Uuid,
    /// Unique listings in extraction order
    pub jobs: Vec<JobListing>,
    /// Qualification results, one per listing
    pub qualifications: Vec<QualificationResult>,
    /// Counters
    pub stats: SessionStats,
    /// Whether any challenge was encountered
    pub captcha_required: bool,
    /// Every challenge seen, in order
    pub captcha_events: Vec<CaptchaEvent>,
    /// Terminal status
    pub outcome: ScrapeOutcome,
    /// Start of the session
    pub started_at: Timestamp,
    /// End of the session
    pub finished_at: Timestamp,
}

impl ScrapeResult {
    /// Whether the scrape completed normally.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcome == ScrapeOutcome::Completed
    }

    /// Qualification for a listing.
    #[must_use]
    pub fn qualification_for(&self, id: &JobId) -> Option<&QualificationResult> {
        self.qualifications.iter().find(|q| &q.job_id == id)
    }

    /// Seconds the session took.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (*self.finished_at.as_datetime() - *self.started_at.as_datetime()).num_seconds()
    }
}
