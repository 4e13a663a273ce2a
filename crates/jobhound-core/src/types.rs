//! Shared types used across the Jobhound engine.
//!
//! This module defines the listing identifier, the semantic field kinds the
//! extractor resolves, and the classification enums carried by a listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Query parameters that only carry tracking state and never identify a job.
const TRACKING_PARAMS: &[&str] = &[
    "ref",
    "refid",
    "trackingid",
    "trk",
    "trkinfo",
    "ebp",
    "position",
    "pagenum",
    "origin",
    "lipi",
    "src",
    "from",
    "fbclid",
    "gclid",
];

/// Length of the hex digest kept in a `JobId`.
const ID_DIGEST_LEN: usize = 16;

/// Stable fingerprint identifying a job listing within a session.
///
/// Derived from the normalized listing URL when one is known, otherwise from
/// a hash of the normalized title, company and location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Derive the identifier for a listing.
    ///
    /// A non-empty URL always wins; title text is only used when the URL is
    /// absent, so two postings with identical titles but different URLs get
    /// distinct ids.
    #[must_use]
    pub fn derive(url: Option<&str>, title: &str, company: &str, location: &str) -> Self {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self::from_url(url),
            None => Self::from_text(title, company, location),
        }
    }

    /// Fingerprint a listing URL after normalization.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self(format!("url-{}", digest(&normalize_url(url))))
    }

    /// Fingerprint a listing by its visible text fields.
    #[must_use]
    pub fn from_text(title: &str, company: &str, location: &str) -> Self {
        let key = [title, company, location]
            .iter()
            .map(|part| normalize_text(part))
            .collect::<Vec<_>>()
            .join("|");
        Self(format!("txt-{}", digest(&key)))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn digest(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(hash);
    hex.truncate(ID_DIGEST_LEN);
    hex
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a listing URL so that cosmetic differences do not split a job.
///
/// Drops the fragment, tracking parameters and trailing slashes, and sorts the
/// remaining query pairs. Unparsable input is trimmed and lowercased.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw.trim()) else {
        return raw.trim().trim_end_matches('/').to_lowercase();
    };

    url.set_fragment(None);

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            !key.starts_with("utm_") && !TRACKING_PARAMS.contains(&key.as_str())
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(if path.is_empty() { "/" } else { &path });

    url.to_string().trim_end_matches('/').to_string()
}

/// Semantic fields the extractor resolves through the selector catalog.
///
/// Every variant must have at least one selector candidate; the catalog is
/// validated against [`FieldKind::ALL`] when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A result card in the search list
    ResultCard,
    /// Title text on a card
    CardTitle,
    /// Company text on a card
    CardCompany,
    /// Location text on a card
    CardLocation,
    /// Link to the listing on a card
    CardLink,
    /// Detail panel container
    PanelContainer,
    /// Job title inside the panel
    Title,
    /// Company name inside the panel
    Company,
    /// Location inside the panel
    Location,
    /// Job description body inside the panel
    Description,
    /// Insight chips (arrangement, job type, seniority)
    Insights,
    /// Posting age or date
    PostedDate,
    /// External apply link
    ApplyLink,
    /// In-platform quick-apply marker
    QuickApply,
    /// Header text holding the total number of results
    ResultCount,
    /// Pagination control for the next result page
    NextPage,
}

impl FieldKind {
    /// Every field kind, in catalog order.
    pub const ALL: [FieldKind; 16] = [
        Self::ResultCard,
        Self::CardTitle,
        Self::CardCompany,
        Self::CardLocation,
        Self::CardLink,
        Self::PanelContainer,
        Self::Title,
        Self::Company,
        Self::Location,
        Self::Description,
        Self::Insights,
        Self::PostedDate,
        Self::ApplyLink,
        Self::QuickApply,
        Self::ResultCount,
        Self::NextPage,
    ];

    /// Panel fields that count towards extraction confidence.
    pub const PANEL_FIELDS: [FieldKind; 6] = [
        Self::Title,
        Self::Company,
        Self::Location,
        Self::Description,
        Self::Insights,
        Self::PostedDate,
    ];

    /// Snake-case key used in catalog override files.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::ResultCard => "result_card",
            Self::CardTitle => "card_title",
            Self::CardCompany => "card_company",
            Self::CardLocation => "card_location",
            Self::CardLink => "card_link",
            Self::PanelContainer => "panel_container",
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::Description => "description",
            Self::Insights => "insights",
            Self::PostedDate => "posted_date",
            Self::ApplyLink => "apply_link",
            Self::QuickApply => "quick_apply",
            Self::ResultCount => "result_count",
            Self::NextPage => "next_page",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// How a listing's fields were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Panel loaded and every panel field resolved through its primary selector
    Full,
    /// Panel loaded but some fields needed fallbacks or were missing
    PartialPanel,
    /// Panel never loaded; only card-level fields are present
    CardFallback,
}

/// Where the work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkArrangement {
    /// Fully remote
    Remote,
    /// Mix of remote and on-site
    Hybrid,
    /// On-site only
    OnSite,
}

impl WorkArrangement {
    /// Classify free text such as an insight chip ("Remote · Full-time").
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.contains("hybrid") {
            Some(Self::Hybrid)
        } else if text.contains("remote") {
            Some(Self::Remote)
        } else if text.contains("on-site") || text.contains("onsite") || text.contains("on site")
        {
            Some(Self::OnSite)
        } else {
            None
        }
    }

    /// Label shown by the filter UI.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Remote => "Remote",
            Self::Hybrid => "Hybrid",
            Self::OnSite => "On-site",
        }
    }
}

/// Employment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Full-time
    FullTime,
    /// Part-time
    PartTime,
    /// Contract
    Contract,
    /// Temporary
    Temporary,
    /// Internship
    Internship,
    /// Volunteer
    Volunteer,
}

impl JobType {
    /// Classify free text such as an insight chip.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        [
            ("full-time", Self::FullTime),
            ("full time", Self::FullTime),
            ("part-time", Self::PartTime),
            ("part time", Self::PartTime),
            ("contract", Self::Contract),
            ("temporary", Self::Temporary),
            ("internship", Self::Internship),
            ("volunteer", Self::Volunteer),
        ]
        .into_iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, kind)| kind)
    }

    /// Label shown by the filter UI.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullTime => "Full-time",
            Self::PartTime => "Part-time",
            Self::Contract => "Contract",
            Self::Temporary => "Temporary",
            Self::Internship => "Internship",
            Self::Volunteer => "Volunteer",
        }
    }
}

/// Seniority of the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    /// Internship
    Internship,
    /// Entry level
    EntryLevel,
    /// Associate
    Associate,
    /// Mid-Senior level
    MidSenior,
    /// Director
    Director,
    /// Executive
    Executive,
}

impl ExperienceLevel {
    /// Classify free text such as an insight chip.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        [
            ("mid-senior", Self::MidSenior),
            ("entry level", Self::EntryLevel),
            ("entry-level", Self::EntryLevel),
            ("associate", Self::Associate),
            ("director", Self::Director),
            ("executive", Self::Executive),
            ("internship", Self::Internship),
        ]
        .into_iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, level)| level)
    }

    /// Label shown by the filter UI.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Internship => "Internship",
            Self::EntryLevel => "Entry level",
            Self::Associate => "Associate",
            Self::MidSenior => "Mid-Senior level",
            Self::Director => "Director",
            Self::Executive => "Executive",
        }
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_ignores_tracking_params() {
        let a = JobId::from_url("https://jobs.example.com/view/123/?refId=abc&trackingId=xyz");
        let b = JobId::from_url("https://jobs.example.com/view/123");
        let c = JobId::from_url("https://JOBS.example.com/view/123/#apply");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_job_id_keeps_identifying_params() {
        let a = JobId::from_url("https://jobs.example.com/search?currentJobId=1&utm_source=x");
        let b = JobId::from_url("https://jobs.example.com/search?currentJobId=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_job_id_url_beats_text() {
        let a = JobId::derive(
            Some("https://jobs.example.com/view/1"),
            "Rust Engineer",
            "Acme",
            "Berlin",
        );
        let b = JobId::derive(
            Some("https://jobs.example.com/view/2"),
            "Rust Engineer",
            "Acme",
            "Berlin",
        );
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("url-"));
    }

    #[test]
    fn test_job_id_text_fallback_normalizes_whitespace_and_case() {
        let a = JobId::derive(None, "Rust  Engineer", "ACME", "Berlin");
        let b = JobId::derive(Some("   "), "rust engineer", "acme", " Berlin ");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("txt-"));
    }

    #[test]
    fn test_normalize_url_sorts_query() {
        assert_eq!(
            normalize_url("https://example.com/jobs?b=2&a=1"),
            "https://example.com/jobs?a=1&b=2"
        );
    }

    #[test]
    fn test_work_arrangement_detect() {
        assert_eq!(
            WorkArrangement::detect("Remote · Full-time"),
            Some(WorkArrangement::Remote)
        );
        assert_eq!(
            WorkArrangement::detect("Hybrid (remote 2 days)"),
            Some(WorkArrangement::Hybrid)
        );
        assert_eq!(
            WorkArrangement::detect("On-site"),
            Some(WorkArrangement::OnSite)
        );
        assert_eq!(WorkArrangement::detect("Berlin, Germany"), None);
    }

    #[test]
    fn test_job_type_and_level_detect() {
        let chip = "Hybrid · Contract · Mid-Senior level";
        assert_eq!(JobType::detect(chip), Some(JobType::Contract));
        assert_eq!(
            ExperienceLevel::detect(chip),
            Some(ExperienceLevel::MidSenior)
        );
        assert_eq!(JobType::detect("Berlin"), None);
    }

    #[test]
    fn test_field_kind_keys_are_unique() {
        let mut keys: Vec<_> = FieldKind::ALL.iter().map(FieldKind::key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), FieldKind::ALL.len());
    }

    #[test]
    fn test_field_kind_serialization_matches_key() {
        for kind in FieldKind::ALL {
            let json = serde_json::to_string(&kind).expect("serialize field kind");
            assert_eq!(json, format!("\"{}\"", kind.key()));
        }
    }
}
