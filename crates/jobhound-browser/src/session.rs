use crate::actions::{extract_domain, BrowserActions, SharedDriver};
use crate::engine::BrowserEngine;
use crate::error::{BrowserError, Result};
use crate::pacing::ActionPacer;
use jobhound_core::{BrowserConfig, RetryPolicy, ScrapingConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One browser session: the driver, its interaction pacing and the
/// navigation retry policy.
///
/// `close` releases the driver exactly once; dropping an unclosed session
/// schedules the close on the current runtime.
pub struct BrowserSession {
    driver: SharedDriver,
    pacer: ActionPacer,
    navigation_retry: RetryPolicy,
    closed: AtomicBool,
}

impl BrowserSession {
    /// Wrap an existing driver.
    pub fn new(driver: SharedDriver, pacer: ActionPacer, navigation_retry: RetryPolicy) -> Self {
        Self {
            driver,
            pacer,
            navigation_retry,
            closed: AtomicBool::new(false),
        }
    }

    /// Launch Chromium with the configured stealth settings.
    pub async fn launch(browser: &BrowserConfig, scraping: &ScrapingConfig) -> Result<Self> {
        let engine = BrowserEngine::launch(browser).await?;
        Ok(Self::new(
            Arc::new(engine),
            ActionPacer::new(scraping.min_action_delay_ms, scraping.max_action_delay_ms),
            browser.navigation_retry(),
        ))
    }

    /// The driver for DOM work.
    pub fn driver(&self) -> &dyn BrowserActions {
        self.driver.as_ref()
    }

    /// Open the search URL. Navigation timeouts are retried with backoff;
    /// any other failure is returned immediately.
    pub async fn open(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
        let domain = extract_domain(url)?;
        tracing::info!(domain = %domain, "Opening search session");
        self.navigate(url, cancel).await
    }

    /// Navigate with the session's retry policy.
    pub async fn navigate(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
        if self.is_closed() {
            return Err(BrowserError::SessionClosed);
        }
        let outcome = self
            .navigation_retry
            .run(Some(cancel), BrowserError::is_navigation_timeout, |attempt| {
                tracing::debug!(attempt, "Navigating to {}", url);
                self.driver.navigate(url)
            })
            .await;
        if outcome.failures > 0 && outcome.is_ok() {
            tracing::info!(failures = outcome.failures, "Navigation recovered after retries");
        }
        outcome.result
    }

    /// Attempts `navigate` makes before giving up on timeouts.
    pub fn navigation_attempts(&self) -> u32 {
        self.navigation_retry.max_attempts
    }

    /// Wait the randomized gap before the next interaction.
    /// Returns `false` if cancelled while waiting.
    pub async fn pace(&self, cancel: &CancellationToken) -> bool {
        self.pacer.pause(cancel).await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release the browser. Only the first call reaches the driver.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::debug!("Closing browser session");
        self.driver.close().await
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::warn!("Browser session dropped without close, closing in background");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let driver = Arc::clone(&self.driver);
            handle.spawn(async move {
                if let Err(e) = driver.close().await {
                    tracing::debug!("Background close failed: {}", e);
                }
            });
        }
    }
}
