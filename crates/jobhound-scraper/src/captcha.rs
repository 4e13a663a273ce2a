//! Challenge and login-wall detection with a pause-until-resolved wait.
//!
//! Detection only: nothing here tries to solve or bypass a challenge. A human
//! clears it in the browser window and then signals through a
//! [`CaptchaHandle`].

use jobhound_browser::BrowserActions;
use jobhound_core::{CaptchaConfig, CaptchaEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static CHALLENGE_URLS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/checkpoint/challenge",
        r"/captcha",
        r"challenges\.cloudflare\.com",
        r"/sorry/index",
        r"[?&]captcha=",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex is valid"))
    .collect()
});

static LOGIN_URLS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"/login\b", r"/authwall", r"/uas/login", r"/checkpoint/lg/", r"/signup\b"]
        .iter()
        .map(|p| Regex::new(p).expect("static regex is valid"))
        .collect()
});

const CHALLENGE_MARKERS: &[&str] = &[
    "iframe[src*='recaptcha']",
    "iframe[src*='hcaptcha']",
    "iframe[title*='challenge']",
    "#captcha-internal",
    ".cf-challenge",
    "#challenge-form",
    "#challenge-running",
];

const LOGIN_MARKERS: &[&str] = &[
    "form.login__form",
    "form[action*='login-submit']",
    "input#session_password",
    ".authwall-join-form",
];

/// What a page inspection found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCheck {
    /// Nothing blocking
    Clear,
    /// A challenge signature matched
    Challenge {
        /// The URL pattern or DOM marker that matched
        signature: String,
    },
    /// The site wants credentials
    LoginWall {
        /// Page URL
        url: String,
        /// The URL pattern or DOM marker that matched
        signature: String,
    },
}

/// How a wait for resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Signalled and the page re-inspected clean
    Resolved,
    /// The resolution timeout elapsed
    TimedOut,
    /// The session was cancelled while waiting
    Cancelled,
}

/// External "challenge resolved" signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CaptchaHandle {
    signal: Arc<watch::Sender<u64>>,
}

impl CaptchaHandle {
    /// Tell a waiting session the challenge has been cleared.
    pub fn resolve(&self) {
        self.signal.send_modify(|n| *n = n.wrapping_add(1));
    }
}

/// Inspects pages for challenge and login signatures.
#[derive(Debug)]
pub struct CaptchaMonitor {
    extra_url_patterns: Vec<String>,
    dom_markers: Vec<String>,
    resolution_timeout: Duration,
    signal: Arc<watch::Sender<u64>>,
}

impl CaptchaMonitor {
    /// Monitor with the built-in signatures plus any configured extras.
    pub fn new(config: &CaptchaConfig) -> Self {
        let mut dom_markers: Vec<String> = CHALLENGE_MARKERS.iter().map(ToString::to_string).collect();
        dom_markers.extend(config.extra_dom_markers.iter().cloned());
        let (signal, _) = watch::channel(0);
        Self {
            extra_url_patterns: config
                .extra_url_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            dom_markers,
            resolution_timeout: Duration::from_secs(config.resolution_timeout_secs),
            signal: Arc::new(signal),
        }
    }

    /// Handle for the resolution signal.
    pub fn handle(&self) -> CaptchaHandle {
        CaptchaHandle {
            signal: Arc::clone(&self.signal),
        }
    }

    /// Look at the current page. Read errors count as clear: a page that
    /// cannot be read will fail the next real operation anyway.
    pub async fn inspect(&self, driver: &dyn BrowserActions) -> PageCheck {
        let url = match driver.current_url().await {
            Ok(url) => url,
            Err(e) => {
                debug!("Cannot read page URL for challenge check: {}", e);
                String::new()
            }
        };
        let lowered = url.to_lowercase();

        if let Some(pattern) = CHALLENGE_URLS.iter().find(|re| re.is_match(&lowered)) {
            return PageCheck::Challenge {
                signature: format!("url:{}", pattern.as_str()),
            };
        }
        if let Some(pattern) = self
            .extra_url_patterns
            .iter()
            .find(|p| lowered.contains(p.as_str()))
        {
            return PageCheck::Challenge {
                signature: format!("url:{pattern}"),
            };
        }
        for marker in &self.dom_markers {
            if driver.exists(marker).await.unwrap_or(false) {
                return PageCheck::Challenge {
                    signature: format!("dom:{marker}"),
                };
            }
        }

        if let Some(pattern) = LOGIN_URLS.iter().find(|re| re.is_match(&lowered)) {
            return PageCheck::LoginWall {
                url,
                signature: format!("url:{}", pattern.as_str()),
            };
        }
        for marker in LOGIN_MARKERS {
            if driver.exists(marker).await.unwrap_or(false) {
                return PageCheck::LoginWall {
                    url,
                    signature: format!("dom:{marker}"),
                };
            }
        }

        PageCheck::Clear
    }

    /// Block until the resolution signal arrives and the page inspects
    /// clean, the timeout elapses, or `cancel` fires. Updates `event`.
    pub async fn await_resolution(
        &self,
        driver: &dyn BrowserActions,
        event: &mut CaptchaEvent,
        cancel: &CancellationToken,
    ) -> Resolution {
        // Subscribe before announcing so an immediate signal is not missed
        let mut signal = self.signal.subscribe();
        event.await_manual_resolution();
        info!(
            signature = event.signature_matched(),
            timeout_secs = self.resolution_timeout.as_secs(),
            "Challenge detected, solve it in the browser window and signal resolution"
        );

        let deadline = tokio::time::Instant::now() + self.resolution_timeout;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    event.abandon();
                    return Resolution::Cancelled;
                }
                () = tokio::time::sleep_until(deadline) => {
                    warn!(signature = event.signature_matched(), "Challenge not resolved in time");
                    event.abandon();
                    return Resolution::TimedOut;
                }
                Ok(()) = signal.changed() => {
                    match self.inspect(driver).await {
                        PageCheck::Challenge { signature } => {
                            warn!(signature = %signature, "Resolution signalled but challenge still present");
                        }
                        _ => {
                            event.resolve();
                            info!("Challenge resolved, resuming");
                            return Resolution::Resolved;
                        }
                    }
                }
            }
        }
    }
}
