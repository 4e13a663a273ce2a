//! Browser automation for Jobhound.
//!
//! Provides the driver abstraction the scraper works against, a Chromium
//! engine with anti-fingerprinting, randomized action pacing, the
//! `BrowserSession` lifecycle wrapper. The scripted HTML fixture driver is
//! available with the `fixture` feature.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod pacing;
pub mod session;

pub use actions::{BrowserActions, SharedDriver};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
#[cfg(any(test, feature = "fixture"))]
pub use fixture::FixturePage;
pub use pacing::ActionPacer;
pub use session::BrowserSession;
