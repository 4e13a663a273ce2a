//! Jobhound Core - Foundation crate for the Jobhound scraping engine.
//!
//! This crate provides the shared data model, error handling, configuration
//! management and retry semantics that every other Jobhound crate depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Identifiers, listing fingerprints and classification enums
//! - [`listing`] - The immutable `JobListing` value object
//! - [`search`] - Search requests, filter specs and the per-session state
//! - [`outcome`] - CAPTCHA events, qualification results and scrape results
//! - [`retry`] - The shared `RetryPolicy`
//!
//! # Example
//!
//! ```rust
//! use jobhound_core::{AppConfig, FilterSpec, ScrapeRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! config.validate()?;
//!
//! let request = ScrapeRequest::new("rust engineer", "Berlin")
//!     .with_filter(FilterSpec::date_posted(7))
//!     .with_max_jobs(config.scraping.max_jobs);
//! assert_eq!(request.filters.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod listing;
pub mod outcome;
pub mod retry;
pub mod search;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BroadeningConfig, BrowserConfig, CaptchaConfig, ExtractionConfig, FilterConfig,
    LlmConfig, QualificationConfig, ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use listing::{JobListing, ListingParts, ValidationFlag};
pub use outcome::{
    CaptchaEvent, CaptchaStatus, FailureReason, FilterReport, QualificationBands,
    QualificationResult, QualificationStatus, ScrapeOutcome, ScrapeResult, SessionStats,
};
pub use retry::{Backoff, RetryOutcome, RetryPolicy};
pub use search::{
    AppliedState, CandidateProfile, FilterKind, FilterSpec, FilterValue, ScrapeRequest,
    SearchSession, SessionState,
};
pub use types::{
    ExperienceLevel, ExtractionMode, FieldKind, JobId, JobType, Timestamp, WorkArrangement,
};
