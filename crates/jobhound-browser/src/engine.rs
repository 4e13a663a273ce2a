use crate::actions::{normalize_text, BrowserActions};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetTimezoneOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures_util::stream::StreamExt;
use jobhound_core::BrowserConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const MUTATION_FLAG: &str = "__jobhoundMutation";

/// Chromium-backed browser automation engine.
///
/// Owns one browser process and a single page; every action runs against
/// that page.
pub struct BrowserEngine {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    page: Page,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch a browser with a randomized fingerprint and default settings
    pub async fn new() -> Result<Self> {
        Self::launch(&BrowserConfig::default()).await
    }

    /// Launch a browser configured from application settings
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Self::with_fingerprint(config, FingerprintConfig::for_session(config)).await
    }

    /// Launch a browser with a specific fingerprint
    pub async fn with_fingerprint(
        config: &BrowserConfig,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        for arg in fingerprint.chrome_args() {
            builder = builder.arg(arg);
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;
        // --user-agent leaves navigator.platform reporting the host OS
        let ua_override = SetUserAgentOverrideParams::builder()
            .user_agent(fingerprint.user_agent.clone())
            .accept_language(fingerprint.locale.clone())
            .platform(fingerprint.platform.clone())
            .build()
            .map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // The handler must be polled for the browser to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("CDP handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(BrowserError::ChromiumError(e.to_string()));
            }
        };

        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(fingerprint.timezone.clone()))
            .await
        {
            tracing::debug!("Timezone override rejected: {}", e);
        }
        if let Err(e) = page.execute(ua_override).await {
            tracing::debug!("User agent override rejected: {}", e);
        }

        tracing::info!(
            headless = config.headless,
            viewport = %format!("{}x{}", fingerprint.viewport_width, fingerprint.viewport_height),
            "Browser launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
            page,
            fingerprint,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        })
    }

    /// Fingerprint applied to this session
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    async fn ensure_open(&self) -> Result<()> {
        if self.browser.lock().await.is_none() {
            return Err(BrowserError::SessionClosed);
        }
        Ok(())
    }

    async fn nth(&self, selector: &str, index: usize) -> Result<Element> {
        self.ensure_open().await?;
        let mut elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| BrowserError::from_cdp(&e, selector))?;
        if index >= elements.len() {
            return Err(BrowserError::SelectorNotFound(format!("{selector}[{index}]")));
        }
        Ok(elements.swap_remove(index))
    }

    async fn nested(&self, scope: &str, index: usize, selector: &str) -> Result<Element> {
        let container = self.nth(scope, index).await?;
        container
            .find_element(selector)
            .await
            .map_err(|e| match BrowserError::from_cdp(&e, selector) {
                BrowserError::ChromiumError(_) => {
                    BrowserError::SelectorNotFound(format!("{scope}[{index}] {selector}"))
                }
                other => other,
            })
    }

    async fn eval_bool(&self, expression: String) -> Result<bool> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::ChromiumError)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| BrowserError::from_cdp(&e, "document"))?;
        result
            .into_value::<bool>()
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}

/// Rendered text of an element, whitespace collapsed.
async fn element_text(element: &Element, selector: &str) -> Result<String> {
    let text = element
        .inner_text()
        .await
        .map_err(|e| BrowserError::from_cdp(&e, selector))?
        .unwrap_or_default();
    Ok(normalize_text(&text))
}

#[async_trait::async_trait]
impl BrowserActions for BrowserEngine {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.ensure_open().await?;
        tracing::debug!("Navigating to {}", url);
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(e.to_string())),
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: self.navigation_timeout.as_secs(),
            }),
        }
    }

    async fn current_url(&self) -> Result<String> {
        self.ensure_open().await?;
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.ensure_open().await?;
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(elements.len()),
            Err(e) => match BrowserError::from_cdp(&e, selector) {
                BrowserError::StaleElement(_) => Err(BrowserError::StaleElement(selector.into())),
                // querySelectorAll with no match is reported as an error by some versions
                _ => Ok(0),
            },
        }
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        let element = self.nth(selector, index).await?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::from_cdp(&e, selector))?;
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str, index: usize) -> Result<()> {
        let element = self.nth(selector, index).await?;
        element
            .scroll_into_view()
            .await
            .map_err(|e| BrowserError::from_cdp(&e, selector))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.count(selector).await? > 0 {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} did not appear within {timeout_ms}ms"
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn watch_mutations(&self, selector: &str) -> Result<()> {
        self.ensure_open().await?;
        let selector_literal = serde_json::to_string(selector)
            .map_err(|e| BrowserError::InvalidSelector(e.to_string()))?;
        let script = format!(
            r"(() => {{
                window.{MUTATION_FLAG} = false;
                const target = document.querySelector({selector_literal}) || document.body;
                const observer = new MutationObserver(() => {{
                    window.{MUTATION_FLAG} = true;
                    observer.disconnect();
                }});
                observer.observe(target, {{ childList: true, subtree: true, characterData: true, attributes: true }});
                return true;
            }})()"
        );
        self.eval_bool(script).await.map(|_| ())
    }

    async fn wait_for_mutation(&self, timeout_ms: u64) -> Result<bool> {
        let script = format!(
            r"new Promise(resolve => {{
                const started = Date.now();
                const poll = () => {{
                    if (window.{MUTATION_FLAG} !== false) return resolve(true);
                    if (Date.now() - started >= {timeout_ms}) return resolve(false);
                    setTimeout(poll, 50);
                }};
                poll();
            }})"
        );
        match self.eval_bool(script).await {
            Ok(mutated) => Ok(mutated),
            // The execution context was replaced, which is itself a mutation
            Err(BrowserError::StaleElement(_)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self.nth(selector, 0).await?;
        element_text(&element, selector).await
    }

    async fn text_in(&self, scope: &str, index: usize, selector: &str) -> Result<String> {
        let element = self.nested(scope, index, selector).await?;
        element_text(&element, selector).await
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let element = self.nth(selector, 0).await?;
        element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::from_cdp(&e, selector))
    }

    async fn attribute_in(
        &self,
        scope: &str,
        index: usize,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let element = self.nested(scope, index, selector).await?;
        element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::from_cdp(&e, selector))
    }

    async fn close(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Err(BrowserError::SessionClosed);
        };
        let result = browser.close().await;
        if let Err(e) = browser.wait().await {
            tracing::debug!("Browser process wait failed: {}", e);
        }
        self.handler.abort();
        tracing::info!("Browser closed");
        result
            .map(|_| ())
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}
