//! The immutable job listing value object.

use crate::types::{
    ExperienceLevel, ExtractionMode, FieldKind, JobId, JobType, Timestamp, WorkArrangement,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Problems the validation pass found with an extracted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationFlag {
    /// Title is missing
    MissingTitle,
    /// Company is missing
    MissingCompany,
    /// Title equals the company name
    TitleEqualsCompany,
    /// Title looks like a legal company name ("Acme Inc.")
    TitleLooksLikeCompany,
    /// Title looks like a location or work arrangement
    TitleLooksLikeLocation,
    /// Title is implausibly long (a description block was captured)
    TitleTooLong,
    /// Title is page chrome rather than a job title
    TitleIsBoilerplate,
    /// Description is missing or too short to be real
    DescriptionTooShort,
}

/// Everything needed to construct a [`JobListing`].
///
/// The extractor fills this in; [`JobListing::new`] freezes it.
#[derive(Debug, Clone, Default)]
pub struct ListingParts {
    /// Canonical listing URL, when the card or panel exposes one
    pub listing_url: Option<String>,
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: String,
    /// Location text
    pub location: Option<String>,
    /// Raw description text
    pub description_raw: Option<String>,
    /// External application URL (`None` means in-platform quick-apply)
    pub application_url: Option<String>,
    /// Work arrangement
    pub work_arrangement: Option<WorkArrangement>,
    /// Seniority
    pub experience_level: Option<ExperienceLevel>,
    /// Employment type
    pub job_type: Option<JobType>,
    /// Posting date
    pub date_posted: Option<NaiveDate>,
    /// How the fields were obtained
    pub extraction_mode: Option<ExtractionMode>,
    /// Confidence in the extraction (clamped to 0..=1)
    pub extraction_confidence: f64,
    /// Fields that resolved through a fallback selector
    pub fallback_fields: Vec<FieldKind>,
    /// Validation problems
    pub flags: Vec<ValidationFlag>,
}

/// A job listing extracted from one result card.
///
/// Created once per card and never mutated afterwards; fields are only
/// readable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    id: JobId,
    listing_url: Option<String>,
    title: String,
    company: String,
    location: Option<String>,
    description_raw: Option<String>,
    application_url: Option<String>,
    work_arrangement: Option<WorkArrangement>,
    experience_level: Option<ExperienceLevel>,
    job_type: Option<JobType>,
    date_posted: Option<NaiveDate>,
    extraction_mode: ExtractionMode,
    extraction_confidence: f64,
    fallback_fields: Vec<FieldKind>,
    flags: Vec<ValidationFlag>,
    extracted_at: Timestamp,
}

impl JobListing {
    /// Freeze extracted parts into a listing, deriving its id.
    #[must_use]
    pub fn new(parts: ListingParts) -> Self {
        let id = JobId::derive(
            parts.listing_url.as_deref(),
            &parts.title,
            &parts.company,
            parts.location.as_deref().unwrap_or_default(),
        );

        Self {
            id,
            listing_url: parts.listing_url,
            title: parts.title,
            company: parts.company,
            location: parts.location,
            description_raw: parts.description_raw,
            application_url: parts.application_url,
            work_arrangement: parts.work_arrangement,
            experience_level: parts.experience_level,
            job_type: parts.job_type,
            date_posted: parts.date_posted,
            extraction_mode: parts.extraction_mode.unwrap_or(ExtractionMode::CardFallback),
            extraction_confidence: parts.extraction_confidence.clamp(0.0, 1.0),
            fallback_fields: parts.fallback_fields,
            flags: parts.flags,
            extracted_at: Timestamp::now(),
        }
    }

    /// Stable listing fingerprint.
    #[must_use]
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Listing URL, if known.
    #[must_use]
    pub fn listing_url(&self) -> Option<&str> {
        self.listing_url.as_deref()
    }

    /// Job title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Hiring company.
    #[must_use]
    pub fn company(&self) -> &str {
        &self.company
    }

    /// Location text.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Raw description text.
    #[must_use]
    pub fn description_raw(&self) -> Option<&str> {
        self.description_raw.as_deref()
    }

    /// External application URL; `None` means quick-apply.
    #[must_use]
    pub fn application_url(&self) -> Option<&str> {
        self.application_url.as_deref()
    }

    /// Whether the listing uses the in-platform quick-apply flow.
    #[must_use]
    pub fn is_quick_apply(&self) -> bool {
        self.application_url.is_none()
    }

    /// Work arrangement.
    #[must_use]
    pub fn work_arrangement(&self) -> Option<WorkArrangement> {
        self.work_arrangement
    }

    /// Seniority.
    #[must_use]
    pub fn experience_level(&self) -> Option<ExperienceLevel> {
        self.experience_level
    }

    /// Employment type.
    #[must_use]
    pub fn job_type(&self) -> Option<JobType> {
        self.job_type
    }

    /// Posting date.
    #[must_use]
    pub fn date_posted(&self) -> Option<NaiveDate> {
        self.date_posted
    }

    /// How the fields were obtained.
    #[must_use]
    pub fn extraction_mode(&self) -> ExtractionMode {
        self.extraction_mode
    }

    /// Confidence in the extraction, 0..=1.
    #[must_use]
    pub fn extraction_confidence(&self) -> f64 {
        self.extraction_confidence
    }

    /// Fields that needed a fallback selector.
    #[must_use]
    pub fn fallback_fields(&self) -> &[FieldKind] {
        &self.fallback_fields
    }

    /// Validation problems.
    #[must_use]
    pub fn flags(&self) -> &[ValidationFlag] {
        &self.flags
    }

    /// Whether the validation pass flagged this listing.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// When the listing was extracted.
    #[must_use]
    pub fn extracted_at(&self) -> Timestamp {
        self.extracted_at
    }

    /// Plain-text rendering used as scoring input.
    #[must_use]
    pub fn to_prompt_text(&self) -> String {
        let mut text = format!("Title: {}\nCompany: {}\n", self.title, self.company);
        if let Some(location) = &self.location {
            text.push_str(&format!("Location: {location}\n"));
        }
        if let Some(arrangement) = self.work_arrangement {
            text.push_str(&format!("Work arrangement: {}\n", arrangement.label()));
        }
        if let Some(job_type) = self.job_type {
            text.push_str(&format!("Job type: {}\n", job_type.label()));
        }
        if let Some(level) = self.experience_level {
            text.push_str(&format!("Experience level: {}\n", level.label()));
        }
        if let Some(description) = &self.description_raw {
            text.push_str("\nDescription:\n");
            text.push_str(description);
        }
        text
    }
}
