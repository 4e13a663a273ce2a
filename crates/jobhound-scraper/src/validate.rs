//! Final validation pass over extracted fields.
//!
//! Clearly wrong results are not dropped; they are flagged and their
//! confidence is capped so consumers can tell them apart.

use jobhound_core::{ExtractionMode, ListingParts, ValidationFlag, WorkArrangement};
use once_cell::sync::Lazy;
use regex::Regex;

/// Confidence ceiling for flagged listings.
pub const FLAGGED_CONFIDENCE_CAP: f64 = 0.3;

const MAX_TITLE_CHARS: usize = 150;

static COMPANY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)(inc|llc|ltd|gmbh|corp|corporation|plc|limited|s\.a|ag|co)\.?$")
        .expect("static regex is valid")
});

const BOILERPLATE_TITLES: &[&str] = &[
    "about the job",
    "job description",
    "apply",
    "easy apply",
    "save",
    "show more",
    "see more",
    "promoted",
    "actively recruiting",
    "sign in",
    "jobs",
];

fn normalized(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Checks one listing's fields.
#[derive(Debug, Clone)]
pub struct ListingValidator {
    min_description_chars: usize,
}

impl ListingValidator {
    pub fn new(min_description_chars: usize) -> Self {
        Self {
            min_description_chars,
        }
    }

    /// Flags that apply to `parts`.
    pub fn check(&self, parts: &ListingParts) -> Vec<ValidationFlag> {
        let mut flags = Vec::new();
        let title = normalized(&parts.title);
        let company = normalized(&parts.company);

        if title.is_empty() {
            flags.push(ValidationFlag::MissingTitle);
        }
        if company.is_empty() {
            flags.push(ValidationFlag::MissingCompany);
        }

        if !title.is_empty() {
            if title == company {
                flags.push(ValidationFlag::TitleEqualsCompany);
            } else if COMPANY_SUFFIX.is_match(&title) {
                flags.push(ValidationFlag::TitleLooksLikeCompany);
            }

            let location = parts.location.as_deref().map(normalized);
            let is_arrangement = [
                WorkArrangement::Remote,
                WorkArrangement::Hybrid,
                WorkArrangement::OnSite,
            ]
            .iter()
            .any(|a| a.label().to_lowercase() == title);
            if location.as_deref() == Some(title.as_str()) || is_arrangement {
                flags.push(ValidationFlag::TitleLooksLikeLocation);
            }

            if parts.title.chars().count() > MAX_TITLE_CHARS {
                flags.push(ValidationFlag::TitleTooLong);
            }
            if BOILERPLATE_TITLES.contains(&title.as_str()) {
                flags.push(ValidationFlag::TitleIsBoilerplate);
            }
        }

        // Card-only listings never carry a description
        let panel_mode = parts.extraction_mode != Some(ExtractionMode::CardFallback);
        let description_len = parts
            .description_raw
            .as_deref()
            .map_or(0, |d| d.trim().chars().count());
        if panel_mode && description_len < self.min_description_chars {
            flags.push(ValidationFlag::DescriptionTooShort);
        }

        flags
    }

    /// Record flags on `parts` and cap its confidence when any fired.
    pub fn apply(&self, parts: &mut ListingParts) {
        let flags = self.check(parts);
        if !flags.is_empty() {
            tracing::debug!(title = %parts.title, ?flags, "listing flagged by validation");
            parts.extraction_confidence = parts.extraction_confidence.min(FLAGGED_CONFIDENCE_CAP);
        }
        parts.flags = flags;
    }
}

impl Default for ListingValidator {
    fn default() -> Self {
        Self::new(50)
    }
}
