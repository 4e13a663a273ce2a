use crate::error::{BrowserError, Result};
use std::sync::Arc;

/// Browser actions for automation.
///
/// Elements are addressed by CSS selector plus match index rather than by
/// handle, so a re-rendered DOM never leaves callers holding a dead reference.
/// Stale nodes surface as [`BrowserError::StaleElement`].
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current page URL
    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching a selector
    async fn count(&self, selector: &str) -> Result<usize>;

    /// Whether at least one element matches a selector
    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.count(selector).await? > 0)
    }

    /// Click the first element matching a selector
    async fn click(&self, selector: &str) -> Result<()> {
        self.click_nth(selector, 0).await
    }

    /// Click the `index`-th element matching a selector
    async fn click_nth(&self, selector: &str, index: usize) -> Result<()>;

    /// Scroll the `index`-th element matching a selector into view
    async fn scroll_into_view(&self, selector: &str, index: usize) -> Result<()>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Start watching the first element matching `selector` (or the document
    /// body while it is absent) for DOM mutations
    async fn watch_mutations(&self, selector: &str) -> Result<()>;

    /// Wait for the watched element to mutate; `Ok(false)` on timeout
    async fn wait_for_mutation(&self, timeout_ms: u64) -> Result<bool>;

    /// Extract text from the first element matching a selector
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Extract text from `selector` inside the `index`-th match of `scope`
    async fn text_in(&self, scope: &str, index: usize, selector: &str) -> Result<String>;

    /// Read an attribute of the first element matching a selector
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Read an attribute of `selector` inside the `index`-th match of `scope`
    async fn attribute_in(
        &self,
        scope: &str,
        index: usize,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>>;

    /// Release the underlying browser
    async fn close(&self) -> Result<()>;
}

/// A driver shared between the session and the components it serves.
pub type SharedDriver = Arc<dyn BrowserActions>;

/// Host part of an absolute URL.
pub fn extract_domain(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
    match parsed.host_str() {
        Some(host) => Ok(host.to_string()),
        None => Err(BrowserError::NavigationError(format!("{url}: no host"))),
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
