//! A scripted in-memory driver over static HTML.
//!
//! `FixturePage` holds a set of named page states. Navigation routes and
//! click rules move between them, which is enough to reproduce result lists,
//! detail panels, filter dropdowns, pagination and challenge pages without a
//! browser. Faults (stale elements, navigation timeouts) can be injected.

use crate::actions::{normalize_text, BrowserActions};
use crate::error::{BrowserError, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct PageState {
    url: Option<String>,
    html: String,
}

#[derive(Debug, Clone)]
struct ClickRule {
    from: String,
    selector: String,
    index: Option<usize>,
    to: String,
}

#[derive(Debug, Default)]
struct Inner {
    states: HashMap<String, PageState>,
    current: Option<String>,
    url: String,
    routes: Vec<(String, String)>,
    clicks: Vec<ClickRule>,
    stale: HashMap<String, u32>,
    navigation_timeouts: u32,
    watched: Option<(String, Option<String>)>,
    click_log: Vec<String>,
    navigation_log: Vec<String>,
    close_count: u32,
}

/// Scripted driver used by tests and dry runs.
#[derive(Debug, Default)]
pub struct FixturePage {
    inner: Mutex<Inner>,
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named page state.
    #[must_use]
    pub fn with_state(self, name: &str, html: impl Into<String>) -> Self {
        self.lock().states.insert(
            name.to_string(),
            PageState {
                url: None,
                html: html.into(),
            },
        );
        self
    }

    /// Register a named page state that also changes the page URL.
    #[must_use]
    pub fn with_state_at(self, name: &str, url: &str, html: impl Into<String>) -> Self {
        self.lock().states.insert(
            name.to_string(),
            PageState {
                url: Some(url.to_string()),
                html: html.into(),
            },
        );
        self
    }

    /// Navigating to a URL starting with `prefix` shows `state`.
    #[must_use]
    pub fn route(self, prefix: &str, state: &str) -> Self {
        self.lock()
            .routes
            .push((prefix.to_string(), state.to_string()));
        self
    }

    /// Clicking any match of `selector` while in `from` moves to `to`.
    #[must_use]
    pub fn on_click(self, from: &str, selector: &str, to: &str) -> Self {
        self.push_rule(from, selector, None, to)
    }

    /// Clicking the `index`-th match of `selector` while in `from` moves to `to`.
    #[must_use]
    pub fn on_click_nth(self, from: &str, selector: &str, index: usize, to: &str) -> Self {
        self.push_rule(from, selector, Some(index), to)
    }

    fn push_rule(self, from: &str, selector: &str, index: Option<usize>, to: &str) -> Self {
        self.lock().clicks.push(ClickRule {
            from: from.to_string(),
            selector: selector.to_string(),
            index,
            to: to.to_string(),
        });
        self
    }

    /// The next `times` reads through `selector` fail with a stale-element error.
    #[must_use]
    pub fn with_stale(self, selector: &str, times: u32) -> Self {
        self.lock().stale.insert(selector.to_string(), times);
        self
    }

    /// The next `times` navigations time out.
    #[must_use]
    pub fn with_navigation_timeouts(self, times: u32) -> Self {
        self.lock().navigation_timeouts = times;
        self
    }

    /// Start in `state` without navigating.
    #[must_use]
    pub fn starting_at(self, state: &str) -> Self {
        self.set_state(state);
        self
    }

    /// Switch to a state, as an out-of-band page change would.
    pub fn set_state(&self, state: &str) {
        let mut inner = self.lock();
        enter(&mut inner, state);
    }

    /// Name of the current state.
    pub fn current_state(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// Every successful click as `selector[index]`, in order.
    pub fn click_log(&self) -> Vec<String> {
        self.lock().click_log.clone()
    }

    /// Every navigation target, in order.
    pub fn navigation_log(&self) -> Vec<String> {
        self.lock().navigation_log.clone()
    }

    /// How many times `close` was called.
    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned fixture only happens after a test already panicked
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_open(inner: &Inner) -> Result<()> {
        if inner.close_count > 0 {
            Err(BrowserError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn take_stale(inner: &mut Inner, selector: &str) -> Result<()> {
        if let Some(remaining) = inner.stale.get_mut(selector) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::StaleElement(selector.to_string()));
            }
        }
        Ok(())
    }

    /// Run a read against the current document.
    fn read<T>(&self, f: impl FnOnce(&Html) -> Result<T>) -> Result<T> {
        let inner = self.lock();
        Self::check_open(&inner)?;
        let html = current_html(&inner);
        let document = Html::parse_document(&html);
        f(&document)
    }
}

fn enter(inner: &mut Inner, state: &str) {
    if let Some(url) = inner.states.get(state).and_then(|s| s.url.clone()) {
        inner.url = url;
    }
    inner.current = Some(state.to_string());
}

fn current_html(inner: &Inner) -> String {
    inner
        .current
        .as_ref()
        .and_then(|name| inner.states.get(name))
        .map(|s| s.html.clone())
        .unwrap_or_default()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| BrowserError::InvalidSelector(format!("{selector}: {e}")))
}

fn nth<'a>(document: &'a Html, selector: &str, index: usize) -> Result<ElementRef<'a>> {
    let parsed = parse_selector(selector)?;
    document
        .select(&parsed)
        .nth(index)
        .ok_or_else(|| BrowserError::SelectorNotFound(format!("{selector}[{index}]")))
}

fn nested<'a>(
    document: &'a Html,
    scope: &str,
    index: usize,
    selector: &str,
) -> Result<ElementRef<'a>> {
    let container = nth(document, scope, index)?;
    let parsed = parse_selector(selector)?;
    container
        .select(&parsed)
        .next()
        .ok_or_else(|| BrowserError::SelectorNotFound(format!("{scope}[{index}] {selector}")))
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn snapshot(inner: &Inner, selector: &str) -> Option<String> {
    let document = Html::parse_document(&current_html(inner));
    let parsed = Selector::parse(selector).ok()?;
    let html = document.select(&parsed).next().map(|el| el.html());
    html
}

#[async_trait::async_trait]
impl BrowserActions for FixturePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check_open(&inner)?;
        inner.navigation_log.push(url.to_string());

        if inner.navigation_timeouts > 0 {
            inner.navigation_timeouts -= 1;
            return Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: 30,
            });
        }

        let target = inner
            .routes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, state)| state.clone())
            .ok_or_else(|| BrowserError::NavigationError(format!("no fixture route for {url}")))?;
        inner.url = url.to_string();
        enter(&mut inner, &target);
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let inner = self.lock();
        Self::check_open(&inner)?;
        Ok(inner.url.clone())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.read(|document| Ok(document.select(&parse_selector(selector)?).count()))
    }

    async fn click_nth(&self, selector: &str, index: usize) -> Result<()> {
        let mut inner = self.lock();
        Self::check_open(&inner)?;
        Self::take_stale(&mut inner, selector)?;
        {
            let document = Html::parse_document(&current_html(&inner));
            nth(&document, selector, index)?;
        }

        inner.click_log.push(format!("{selector}[{index}]"));
        let current = inner.current.clone().unwrap_or_default();
        let target = inner
            .clicks
            .iter()
            .find(|rule| {
                rule.from == current
                    && rule.selector == selector
                    && rule.index.map_or(true, |i| i == index)
            })
            .map(|rule| rule.to.clone());
        if let Some(target) = target {
            enter(&mut inner, &target);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str, index: usize) -> Result<()> {
        self.read(|document| nth(document, selector, index).map(|_| ()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()> {
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(BrowserError::Timeout(format!(
                "{selector} did not appear within {timeout_ms}ms"
            )))
        }
    }

    async fn watch_mutations(&self, selector: &str) -> Result<()> {
        let mut inner = self.lock();
        Self::check_open(&inner)?;
        let before = snapshot(&inner, selector);
        inner.watched = Some((selector.to_string(), before));
        Ok(())
    }

    async fn wait_for_mutation(&self, _timeout_ms: u64) -> Result<bool> {
        let mut inner = self.lock();
        Self::check_open(&inner)?;
        let Some((selector, before)) = inner.watched.take() else {
            return Ok(false);
        };
        let after = snapshot(&inner, &selector);
        Ok(after.is_some() && after != before)
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        {
            let mut inner = self.lock();
            Self::take_stale(&mut inner, selector)?;
        }
        self.read(|document| nth(document, selector, 0).map(text_of))
    }

    async fn text_in(&self, scope: &str, index: usize, selector: &str) -> Result<String> {
        {
            let mut inner = self.lock();
            Self::take_stale(&mut inner, selector)?;
        }
        self.read(|document| nested(document, scope, index, selector).map(text_of))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        self.read(|document| {
            nth(document, selector, 0).map(|el| el.value().attr(name).map(ToString::to_string))
        })
    }

    async fn attribute_in(
        &self,
        scope: &str,
        index: usize,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>> {
        self.read(|document| {
            nested(document, scope, index, selector)
                .map(|el| el.value().attr(name).map(ToString::to_string))
        })
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        inner.close_count += 1;
        if inner.close_count > 1 {
            return Err(BrowserError::SessionClosed);
        }
        Ok(())
    }
}
