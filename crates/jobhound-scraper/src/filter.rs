//! UI-driven filter application.
//!
//! Filters do not change the page address, so each one is applied by
//! clicking through the filter controls and verified through an "active
//! filter" indicator. Every step is bounded and every failure degrades to a
//! `Failed` outcome; nothing here aborts the scrape.

use crate::selectors::{FilterControls, SelectorCatalog};
use jobhound_browser::BrowserActions;
use jobhound_core::{
    AppliedState, BroadeningConfig, FieldKind, FilterKind, FilterReport, FilterSpec, FilterValue,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Root element watched for the DOM change a filter click causes.
const MUTATION_ROOT: &str = "body";

static DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,.\s]*").expect("static regex is valid"));

/// States of the per-filter state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    Idle,
    CandidateSearch,
    Clicked,
    Verifying,
    Applied,
    Failed,
}

/// Result of applying one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOutcome {
    pub kind: FilterKind,
    pub requested: FilterValue,
    pub state: AppliedState,
    /// Every phase entered, in order, across all attempts
    pub trace: Vec<FilterPhase>,
    /// Option selector that was verified
    pub selector: Option<String>,
    /// Date window kept, for date filters
    pub window_days: Option<u32>,
    /// Windows tried by broadening
    pub attempted_windows: Vec<u32>,
    /// Result count observed for the kept window
    pub result_count: Option<usize>,
}

impl FilterOutcome {
    pub fn report(&self) -> FilterReport {
        FilterReport {
            kind: self.kind,
            requested: self.requested.label(),
            state: self.state,
            window_days: self.window_days,
            attempted_windows: self.attempted_windows.clone(),
        }
    }
}

/// Date-window broadening: widen the window while too few results show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadeningPolicy {
    pub enabled: bool,
    pub min_results: usize,
    pub max_window_days: u32,
    pub growth_factor: u32,
}

impl BroadeningPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::from(BroadeningConfig::default())
        }
    }

    /// First window to try: the request, capped.
    pub fn initial_window(&self, requested: u32) -> u32 {
        requested.clamp(1, self.max_window_days.max(1))
    }

    /// The next wider window, or `None` at the cap.
    pub fn next_window(&self, current: u32) -> Option<u32> {
        if !self.enabled || current >= self.max_window_days {
            return None;
        }
        let next = current
            .saturating_mul(self.growth_factor.max(2))
            .min(self.max_window_days);
        (next > current).then_some(next)
    }

    pub fn is_enough(&self, count: usize) -> bool {
        count >= self.min_results
    }
}

impl From<BroadeningConfig> for BroadeningPolicy {
    fn from(config: BroadeningConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_results: config.min_results,
            max_window_days: config.max_window_days,
            growth_factor: config.growth_factor,
        }
    }
}

/// Applies filters through the UI.
pub struct FilterApplier<'a> {
    driver: &'a dyn BrowserActions,
    catalog: &'a SelectorCatalog,
    mutation_timeout_ms: u64,
    broadening: BroadeningPolicy,
}

impl<'a> FilterApplier<'a> {
    pub fn new(
        driver: &'a dyn BrowserActions,
        catalog: &'a SelectorCatalog,
        mutation_timeout_ms: u64,
        broadening: BroadeningPolicy,
    ) -> Self {
        Self {
            driver,
            catalog,
            mutation_timeout_ms,
            broadening,
        }
    }

    /// Apply one filter and record the final state on `spec`.
    ///
    /// Always terminates in `Applied` or `Failed`.
    pub async fn apply(&self, spec: &mut FilterSpec, cancel: &CancellationToken) -> FilterOutcome {
        let outcome = match spec.value() {
            FilterValue::DatePosted(days) => self.apply_date_window(spec, days, cancel).await,
            value => {
                let mut trace = vec![FilterPhase::Idle];
                let selector = self.attempt(spec, value, &mut trace, cancel).await;
                FilterOutcome {
                    kind: spec.kind(),
                    requested: value,
                    state: state_of(selector.is_some()),
                    trace,
                    selector,
                    window_days: None,
                    attempted_windows: Vec::new(),
                    result_count: None,
                }
            }
        };

        let recorded = match outcome.state {
            AppliedState::Applied => spec.mark_applied(),
            _ => spec.mark_failed(),
        };
        if let Err(e) = recorded {
            // A spec applied twice keeps its first state
            warn!(filter = %spec.kind(), "filter state not updated: {}", e);
        }

        match outcome.state {
            AppliedState::Applied => info!(
                filter = %outcome.kind,
                value = %outcome.requested.label(),
                window_days = ?outcome.window_days,
                "Filter applied"
            ),
            _ => warn!(
                filter = %outcome.kind,
                value = %outcome.requested.label(),
                "Filter could not be applied, continuing without it"
            ),
        }
        outcome
    }

    async fn apply_date_window(
        &self,
        spec: &FilterSpec,
        requested_days: u32,
        cancel: &CancellationToken,
    ) -> FilterOutcome {
        let mut trace = vec![FilterPhase::Idle];
        let mut attempted = Vec::new();
        let mut best: Option<(u32, usize, String)> = None;
        let mut current: Option<u32> = None;
        let mut window = self.broadening.initial_window(requested_days);
        if window != requested_days {
            debug!(requested_days, window, "date window capped");
        }

        loop {
            attempted.push(window);
            let Some(selector) = self
                .attempt(spec, FilterValue::DatePosted(window), &mut trace, cancel)
                .await
            else {
                break;
            };
            current = Some(window);

            let count = self.result_count().await;
            debug!(window, count, "date window result count");
            if best.as_ref().map_or(true, |(_, c, _)| count > *c) {
                best = Some((window, count, selector));
            }

            if self.broadening.is_enough(count) || cancel.is_cancelled() {
                break;
            }
            match self.broadening.next_window(window) {
                Some(next) => {
                    info!(from = window, to = next, count, "Too few results, broadening date window");
                    window = next;
                }
                None => break,
            }
        }

        if let Some((best_window, _, _)) = &best {
            if current != Some(*best_window) {
                info!(window = best_window, "Re-applying date window with the most results");
                match self
                    .attempt(spec, FilterValue::DatePosted(*best_window), &mut trace, cancel)
                    .await
                {
                    Some(selector) => {
                        if let Some(best) = best.as_mut() {
                            best.2 = selector;
                        }
                    }
                    None => best = None,
                }
            }
        }

        let applied = best.is_some();
        FilterOutcome {
            kind: FilterKind::DatePosted,
            requested: spec.value(),
            state: state_of(applied),
            trace,
            window_days: best.as_ref().map(|(w, _, _)| *w),
            result_count: best.as_ref().map(|(_, c, _)| *c),
            selector: best.map(|(_, _, s)| s),
            attempted_windows: attempted,
        }
    }

    /// One pass of the state machine for a concrete value. Returns the
    /// verified option selector.
    async fn attempt(
        &self,
        spec: &FilterSpec,
        value: FilterValue,
        trace: &mut Vec<FilterPhase>,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let controls = self.catalog.filter_controls(value.kind());
        let candidates = if spec.selector_candidates().is_empty() {
            controls.option_candidates(&value)
        } else {
            spec.selector_candidates()
                .iter()
                .map(|t| value.render(t))
                .collect()
        };

        trace.push(FilterPhase::CandidateSearch);
        self.open_controls(controls).await;

        for candidate in &candidates {
            if cancel.is_cancelled() {
                break;
            }
            match self.driver.exists(candidate).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(filter = %value.kind(), candidate = %candidate, "option not found");
                    continue;
                }
                Err(e) => {
                    debug!(filter = %value.kind(), candidate = %candidate, "option lookup failed: {}", e);
                    continue;
                }
            }

            if let Err(e) = self.driver.watch_mutations(MUTATION_ROOT).await {
                debug!("cannot watch for filter mutation: {}", e);
            }
            if let Err(e) = self.driver.click(candidate).await {
                debug!(filter = %value.kind(), candidate = %candidate, "option click failed: {}", e);
                continue;
            }
            trace.push(FilterPhase::Clicked);
            self.confirm(controls).await;

            let mutated = self
                .driver
                .wait_for_mutation(self.mutation_timeout_ms)
                .await
                .unwrap_or(false);
            if !mutated {
                debug!(filter = %value.kind(), "no DOM change after filter click");
            }

            trace.push(FilterPhase::Verifying);
            if self.verify(controls, &value, mutated).await {
                trace.push(FilterPhase::Applied);
                return Some(candidate.clone());
            }
            // The click landed but the UI does not show the filter; trying
            // further options could stack conflicting selections
            break;
        }

        trace.push(FilterPhase::Failed);
        None
    }

    async fn open_controls(&self, controls: &FilterControls) {
        for trigger in &controls.triggers {
            if self.driver.exists(trigger).await.unwrap_or(false) {
                match self.driver.click(trigger).await {
                    Ok(()) => return,
                    Err(e) => debug!(trigger = %trigger, "filter trigger click failed: {}", e),
                }
            }
        }
    }

    async fn confirm(&self, controls: &FilterControls) {
        for button in &controls.apply {
            if self.driver.exists(button).await.unwrap_or(false) {
                match self.driver.click(button).await {
                    Ok(()) => return,
                    Err(e) => debug!(button = %button, "filter confirm click failed: {}", e),
                }
            }
        }
    }

    async fn verify(&self, controls: &FilterControls, value: &FilterValue, mutated: bool) -> bool {
        let indicators = controls.active_candidates(value);
        if indicators.is_empty() {
            return mutated;
        }
        for indicator in &indicators {
            if self.driver.exists(indicator).await.unwrap_or(false) {
                return true;
            }
        }
        false
    }

    /// Results currently listed: the header count when present, otherwise
    /// the number of visible cards.
    pub async fn result_count(&self) -> usize {
        for selector in self.catalog.candidates(FieldKind::ResultCount) {
            if let Ok(text) = self.driver.extract_text(selector).await {
                if let Some(count) = parse_count(&text) {
                    return count;
                }
            }
        }
        for selector in self.catalog.candidates(FieldKind::ResultCard) {
            if let Ok(count) = self.driver.count(selector).await {
                if count > 0 {
                    return count;
                }
            }
        }
        0
    }
}

fn state_of(applied: bool) -> AppliedState {
    if applied {
        AppliedState::Applied
    } else {
        AppliedState::Failed
    }
}

/// "1,234 results" -> 1234
fn parse_count(text: &str) -> Option<usize> {
    let digits: String = DIGITS
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobhound_browser::FixturePage;
    use jobhound_core::WorkArrangement;

    fn policy() -> BroadeningPolicy {
        BroadeningPolicy::from(BroadeningConfig::default())
    }

    #[test]
    fn test_window_sequence_is_capped() {
        let policy = policy();
        let mut windows = vec![policy.initial_window(7)];
        while let Some(next) = policy.next_window(*windows.last().unwrap()) {
            windows.push(next);
        }
        assert_eq!(windows, vec![7, 14, 28, 30]);
        assert_eq!(policy.initial_window(90), 30);
        assert_eq!(policy.next_window(30), None);
        assert_eq!(BroadeningPolicy::disabled().next_window(7), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("1,234 results"), Some(1234));
        assert_eq!(parse_count("12 results"), Some(12));
        assert_eq!(parse_count("No matching jobs"), None);
    }

    fn option(code: &str) -> String {
        format!("input[name='date-posted-filter-value'][value='{code}']")
    }

    fn results_page(count: usize, active: Option<&str>) -> String {
        let cards: String = (0..count)
            .map(|i| format!(r#"<li class="jobs-search-results__list-item">Job {i}</li>"#))
            .collect();
        let marker = active
            .map(|code| format!(r#"<span data-active-filter="{code}"></span>"#))
            .unwrap_or_default();
        format!(
            r#"<div class="jobs-search-results-list__subtitle">{count} results</div>{marker}
            <input name="date-posted-filter-value" value="r86400">
            <input name="date-posted-filter-value" value="r604800">
            <input name="date-posted-filter-value" value="r1209600">
            <input name="date-posted-filter-value" value="r2419200">
            <input name="date-posted-filter-value" value="r2592000">
            <input name="remote-filter-value" value="2">
            <ul>{cards}</ul>"#
        )
    }

    const WEEK: &str = "r604800";
    const TWO_WEEKS: &str = "r1209600";
    const FOUR_WEEKS: &str = "r2419200";
    const MONTH: &str = "r2592000";

    async fn apply(page: &FixturePage, spec: &mut FilterSpec) -> FilterOutcome {
        let catalog = SelectorCatalog::builtin();
        let applier = FilterApplier::new(page, &catalog, 1000, policy());
        applier.apply(spec, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_broadening_keeps_larger_window() {
        let page = FixturePage::new()
            .with_state("start", results_page(20, None))
            .with_state("week", results_page(3, Some(WEEK)))
            .with_state("two_weeks", results_page(12, Some(TWO_WEEKS)))
            .on_click("start", &option(WEEK), "week")
            .on_click("week", &option(TWO_WEEKS), "two_weeks")
            .starting_at("start");

        let mut spec = FilterSpec::date_posted(7);
        let outcome = apply(&page, &mut spec).await;

        assert_eq!(outcome.state, AppliedState::Applied);
        assert_eq!(spec.applied_state(), AppliedState::Applied);
        assert_eq!(outcome.attempted_windows, vec![7, 14]);
        assert_eq!(outcome.window_days, Some(14));
        assert_eq!(outcome.result_count, Some(12));
        assert_eq!(page.current_state().as_deref(), Some("two_weeks"));
        assert_eq!(outcome.report().window_days, Some(14));
    }

    #[tokio::test]
    async fn test_broadening_never_exceeds_cap_and_reapplies_best() {
        let page = FixturePage::new()
            .with_state("start", results_page(20, None))
            .with_state("week", results_page(3, Some(WEEK)))
            .with_state("two_weeks", results_page(2, Some(TWO_WEEKS)))
            .with_state("four_weeks", results_page(1, Some(FOUR_WEEKS)))
            .with_state("month", results_page(0, Some(MONTH)))
            .on_click("start", &option(WEEK), "week")
            .on_click("week", &option(TWO_WEEKS), "two_weeks")
            .on_click("two_weeks", &option(FOUR_WEEKS), "four_weeks")
            .on_click("four_weeks", &option(MONTH), "month")
            .on_click("month", &option(WEEK), "week")
            .starting_at("start");

        let mut spec = FilterSpec::date_posted(7);
        let outcome = apply(&page, &mut spec).await;

        assert_eq!(outcome.attempted_windows, vec![7, 14, 28, 30]);
        assert!(outcome.attempted_windows.iter().all(|w| *w <= 30));
        assert_eq!(outcome.window_days, Some(7));
        assert_eq!(outcome.result_count, Some(3));
        // The kept window is visible again
        assert_eq!(page.current_state().as_deref(), Some("week"));
        assert_eq!(page.click_log().last(), Some(&format!("{}[0]", option(WEEK))));
    }

    #[tokio::test]
    async fn test_oversized_request_is_clamped() {
        let page = FixturePage::new()
            .with_state("start", results_page(20, None))
            .with_state("month", results_page(40, Some(MONTH)))
            .on_click("start", &option(MONTH), "month")
            .starting_at("start");

        let mut spec = FilterSpec::date_posted(90);
        let outcome = apply(&page, &mut spec).await;
        assert_eq!(outcome.attempted_windows, vec![30]);
        assert_eq!(outcome.window_days, Some(30));
    }

    #[tokio::test]
    async fn test_missing_option_fails_gracefully() {
        let page = FixturePage::new()
            .with_state("start", results_page(5, None))
            .starting_at("start");

        let mut spec = FilterSpec::job_type(jobhound_core::JobType::Contract);
        let outcome = apply(&page, &mut spec).await;

        assert_eq!(outcome.state, AppliedState::Failed);
        assert_eq!(spec.applied_state(), AppliedState::Failed);
        assert_eq!(
            outcome.trace,
            vec![FilterPhase::Idle, FilterPhase::CandidateSearch, FilterPhase::Failed]
        );
        assert!(page.click_log().is_empty());
    }

    #[tokio::test]
    async fn test_unverified_click_fails() {
        // Clicking changes the page but no active indicator appears
        let page = FixturePage::new()
            .with_state("start", results_page(5, None))
            .with_state("after", results_page(4, None))
            .on_click("start", "input[name='remote-filter-value'][value='2']", "after")
            .starting_at("start");

        let mut spec = FilterSpec::work_arrangement(WorkArrangement::Remote);
        let outcome = apply(&page, &mut spec).await;

        assert_eq!(outcome.state, AppliedState::Failed);
        assert_eq!(
            outcome.trace,
            vec![
                FilterPhase::Idle,
                FilterPhase::CandidateSearch,
                FilterPhase::Clicked,
                FilterPhase::Verifying,
                FilterPhase::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_explicit_candidates_take_precedence() {
        let page = FixturePage::new()
            .with_state("start", r#"<button id="remote-only">Remote</button>"#)
            .with_state(
                "after",
                r#"<button id="remote-only" data-active-filter="2">Remote</button>"#,
            )
            .on_click("start", "#remote-only", "after")
            .starting_at("start");

        let mut spec = FilterSpec::work_arrangement(WorkArrangement::Remote)
            .with_candidates(vec!["#missing".to_string(), "#remote-only".to_string()]);
        let outcome = apply(&page, &mut spec).await;

        assert_eq!(outcome.state, AppliedState::Applied);
        assert_eq!(outcome.selector.as_deref(), Some("#remote-only"));
    }
}
