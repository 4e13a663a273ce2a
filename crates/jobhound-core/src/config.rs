//! Configuration management for Jobhound.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::outcome::QualificationBands;
use crate::retry::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobhound/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser session settings
    pub browser: BrowserConfig,
    /// Result-page iteration and pacing
    pub scraping: ScrapingConfig,
    /// Filter application and date-window broadening
    pub filters: FilterConfig,
    /// Panel extraction
    pub extraction: ExtractionConfig,
    /// Challenge handling
    pub captcha: CaptchaConfig,
    /// Qualification scoring
    pub qualification: QualificationConfig,
    /// LLM provider selection
    pub llm: LlmConfig,
}

impl AppConfig {
    /// Load `config.toml` from the platform config directory.
    ///
    /// A missing file is not an error: every section has defaults.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;
        if path.is_file() {
            return Self::load_from(&path);
        }
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(path).map_err(ConfigError::io(path))?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBHOUND_HEADLESS`: Override browser headless mode (true/false)
    /// - `JOBHOUND_MAX_JOBS`: Override the job cap
    /// - `JOBHOUND_LLM_PROVIDER`: Override the LLM provider
    /// - `JOBHOUND_LLM_MODEL`: Override the LLM model
    /// - `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`: Provider credentials
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("JOBHOUND_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("JOBHOUND_MAX_JOBS") {
            if let Ok(max_jobs) = val.parse() {
                self.scraping.max_jobs = max_jobs;
                tracing::debug!("Override scraping.max_jobs from env: {}", max_jobs);
            }
        }

        if let Some(provider) = lookup("JOBHOUND_LLM_PROVIDER") {
            tracing::debug!("Override llm.provider from env: {}", provider);
            self.llm.provider = provider;
        }

        if let Some(model) = lookup("JOBHOUND_LLM_MODEL") {
            tracing::debug!("Override llm.model from env: {}", model);
            self.llm.model = Some(model);
        }

        let key_var = match self.llm.provider.as_str() {
            "anthropic" => Some("ANTHROPIC_API_KEY"),
            "openai" => Some("OPENAI_API_KEY"),
            _ => None,
        };
        if let Some(key) = key_var.and_then(&lookup) {
            self.llm.api_key = Some(key);
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(ConfigError::io(dir))?;
        }
        fs::write(path, contents).map_err(ConfigError::io(path))?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobhound/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "jobhound", "jobhound").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Reject inconsistent values.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.browser.navigation_attempts == 0 {
            return Err(invalid("browser.navigation_attempts", "must be at least 1"));
        }
        if !self.scraping.search_url_template.contains("{keywords}") {
            return Err(invalid(
                "scraping.search_url_template",
                "must contain a {keywords} placeholder",
            ));
        }
        if self.scraping.max_jobs == 0 {
            return Err(invalid("scraping.max_jobs", "must be at least 1"));
        }
        if self.scraping.max_pages == 0 {
            return Err(invalid("scraping.max_pages", "must be at least 1"));
        }
        if self.scraping.min_action_delay_ms > self.scraping.max_action_delay_ms {
            return Err(invalid(
                "scraping.min_action_delay_ms",
                "must not exceed max_action_delay_ms",
            ));
        }

        let broadening = &self.filters.broadening;
        if broadening.growth_factor < 2 {
            return Err(invalid("filters.broadening.growth_factor", "must be at least 2"));
        }
        if broadening.max_window_days == 0 {
            return Err(invalid("filters.broadening.max_window_days", "must be at least 1"));
        }

        if self.extraction.stale_retry_attempts == 0 {
            return Err(invalid("extraction.stale_retry_attempts", "must be at least 1"));
        }
        if self.qualification.max_attempts == 0 {
            return Err(invalid("qualification.max_attempts", "must be at least 1"));
        }
        if self.qualification.workers == 0 {
            return Err(invalid("qualification.workers", "must be at least 1"));
        }
        if !self.qualification.bands().is_ordered() {
            return Err(invalid(
                "qualification",
                "thresholds must satisfy 100 >= highly_qualified > qualified > somewhat_qualified",
            ));
        }
        if !matches!(
            self.llm.provider.as_str(),
            "none" | "anthropic" | "openai" | "ollama"
        ) {
            return Err(invalid(
                "llm.provider",
                "expected one of none, anthropic, openai, ollama",
            ));
        }

        Ok(())
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Randomize user agent and viewport per session
    pub randomize_fingerprint: bool,
    /// Browser window width (used when not randomized)
    pub window_width: u32,
    /// Browser window height (used when not randomized)
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Attempts for a timed-out navigation before the session fails
    pub navigation_attempts: u32,
    /// Delay after the first navigation timeout, doubled per failure
    pub navigation_backoff_ms: u64,
    /// Explicit Chrome/Chromium binary
    pub chrome_executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            randomize_fingerprint: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            navigation_attempts: 3,
            navigation_backoff_ms: 2000,
            chrome_executable: None,
        }
    }
}

impl BrowserConfig {
    /// Retry policy for navigation timeouts.
    #[must_use]
    pub fn navigation_retry(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.navigation_attempts,
            Duration::from_millis(self.navigation_backoff_ms),
        )
    }
}

/// Result-page iteration and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Search URL with `{keywords}` and `{location}` placeholders
    pub search_url_template: String,
    /// Default job cap when a request does not set one
    pub max_jobs: usize,
    /// Maximum result pages to visit
    pub max_pages: u32,
    /// Lower bound of the randomized delay between card interactions
    pub min_action_delay_ms: u64,
    /// Upper bound of the randomized delay between card interactions
    pub max_action_delay_ms: u64,
    /// Timeout for locating elements
    pub element_timeout_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            search_url_template:
                "https://www.linkedin.com/jobs/search/?keywords={keywords}&location={location}"
                    .to_string(),
            max_jobs: 25,
            max_pages: 5,
            min_action_delay_ms: 800,
            max_action_delay_ms: 2500,
            element_timeout_ms: 10_000,
        }
    }
}

/// Filter application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// How long to wait for the results list to change after a click
    pub mutation_timeout_ms: u64,
    /// Date-window broadening policy
    pub broadening: BroadeningConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mutation_timeout_ms: 5000,
            broadening: BroadeningConfig::default(),
        }
    }
}

/// Date-posted broadening policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadeningConfig {
    /// Whether to broaden at all
    pub enabled: bool,
    /// Result count below which the window is widened
    pub min_results: usize,
    /// Widest window ever applied
    pub max_window_days: u32,
    /// Multiplier applied to the window per step
    pub growth_factor: u32,
}

impl Default for BroadeningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_results: 5,
            max_window_days: 30,
            growth_factor: 2,
        }
    }
}

/// Panel extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// How long to wait for the detail panel after a card click
    pub panel_timeout_ms: u64,
    /// Attempts per field when the element goes stale
    pub stale_retry_attempts: u32,
    /// Delay between stale-element retries
    pub stale_backoff_ms: u64,
    /// Descriptions shorter than this are flagged
    pub min_description_chars: usize,
    /// TOML file with selector catalog overrides
    pub selector_overrides: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            panel_timeout_ms: 8000,
            stale_retry_attempts: 3,
            stale_backoff_ms: 250,
            min_description_chars: 50,
            selector_overrides: None,
        }
    }
}

impl ExtractionConfig {
    /// Retry policy for stale-element errors.
    #[must_use]
    pub fn stale_retry(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.stale_retry_attempts,
            Duration::from_millis(self.stale_backoff_ms),
        )
        .with_max_delay(Duration::from_secs(2))
    }
}

/// Challenge handling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// How long to wait for a human before abandoning the session
    pub resolution_timeout_secs: u64,
    /// Extra URL regexes that indicate a challenge
    pub extra_url_patterns: Vec<String>,
    /// Extra CSS selectors that indicate a challenge
    pub extra_dom_markers: Vec<String>,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            resolution_timeout_secs: 300,
            extra_url_patterns: Vec::new(),
            extra_dom_markers: Vec::new(),
        }
    }
}

/// Qualification scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationConfig {
    /// Attempts per listing, including the first
    pub max_attempts: u32,
    /// Delay after the first transient failure
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,
    /// Timeout for a single provider call
    pub request_timeout_secs: u64,
    /// Size of the scoring worker pool
    pub workers: usize,
    /// Lower bound for `HighlyQualified`
    pub highly_qualified: u8,
    /// Lower bound for `Qualified`
    pub qualified: u8,
    /// Lower bound for `SomewhatQualified`
    pub somewhat_qualified: u8,
}

impl Default for QualificationConfig {
    fn default() -> Self {
        let bands = QualificationBands::default();
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            request_timeout_secs: 60,
            workers: 3,
            highly_qualified: bands.highly_qualified,
            qualified: bands.qualified,
            somewhat_qualified: bands.somewhat_qualified,
        }
    }
}

impl QualificationConfig {
    /// Score bands.
    #[must_use]
    pub fn bands(&self) -> QualificationBands {
        QualificationBands {
            highly_qualified: self.highly_qualified,
            qualified: self.qualified,
            somewhat_qualified: self.somewhat_qualified,
        }
    }

    /// Retry policy for provider calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_attempts, Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

/// LLM provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: `anthropic`, `openai`, `ollama`, or `none`
    pub provider: String,
    /// Model name; each provider has its own default
    pub model: Option<String>,
    /// Base URL override (Ollama server, OpenAI-compatible gateways)
    pub base_url: Option<String>,
    /// API key, read from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Maximum tokens for completions
    pub max_tokens: u32,
    /// Temperature for completions
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            max_tokens: 1024,
            temperature: 0.2,
        }
    }
}
