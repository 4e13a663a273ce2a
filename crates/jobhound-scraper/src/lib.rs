//! Jobhound Scraper - panel-based job listing extraction.
//!
//! This crate drives a single browser session through a job search: it opens
//! the results page, applies filters through the UI, clicks each result card
//! and reads the detail panel that updates in place. Listings are validated,
//! deduplicated and handed to the qualification pool as they are extracted.
//!
//! # Features
//!
//! - Typed selector catalog with ordered fallback candidates per field
//! - Filter state machine with date-window broadening
//! - Panel extraction with stale-element retries and a card-only fallback
//! - Challenge detection that pauses the scrape until a human resolves it
//! - Session-level failure handling that always returns partial results
//!
//! # Example
//!
//! ```rust,ignore
//! use jobhound_scraper::{ScrapeOrchestrator, SelectorCatalog};
//! use std::sync::Arc;
//!
//! let session = BrowserSession::launch(&config.browser, &config.scraping).await?;
//! let orchestrator = ScrapeOrchestrator::new(
//!     session,
//!     Arc::new(SelectorCatalog::builtin()),
//!     &config,
//! );
//!
//! let result = orchestrator
//!     .scrape(ScrapeRequest::new("rust engineer", "Berlin").with_filter(FilterSpec::date_posted(7)))
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod captcha;
pub mod dates;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod filter;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod panel;
pub mod selectors;
#[allow(missing_docs)]
pub mod url_builder;
#[allow(missing_docs)]
pub mod validate;

// Re-export commonly used types
pub use captcha::{CaptchaHandle, CaptchaMonitor, PageCheck, Resolution};
pub use error::{Result, ScrapeError};
pub use filter::{BroadeningPolicy, FilterApplier, FilterOutcome, FilterPhase};
pub use orchestrator::ScrapeOrchestrator;
pub use panel::{ApplyTarget, CardFields, CardRef, ExtractionResult, PanelExtractor, PanelFields};
pub use selectors::{FilterControls, SelectorCatalog};
pub use url_builder::build_search_url;
pub use validate::{ListingValidator, FLAGGED_CONFIDENCE_CAP};
