//! Scrape orchestrator driving one browser session end to end.
//!
//! The `ScrapeOrchestrator` owns the browser session and walks it through
//! navigation, filter application and the card loop. All DOM work runs on a
//! single task; only qualification scoring runs concurrently, on a
//! [`ScoringPool`] fed as listings are extracted.

use crate::captcha::{CaptchaHandle, CaptchaMonitor, PageCheck, Resolution};
use crate::error::{fatal_only, Result, ScrapeError};
use crate::filter::{BroadeningPolicy, FilterApplier};
use crate::panel::{CardRef, PanelExtractor};
use crate::selectors::SelectorCatalog;
use crate::url_builder::build_search_url;
use crate::validate::ListingValidator;
use chrono::{NaiveDate, Utc};
use jobhound_browser::{BrowserActions, BrowserError, BrowserSession};
use jobhound_core::{
    AppConfig, CandidateProfile, CaptchaEvent, ExtractionConfig, ExtractionMode, FieldKind,
    FilterConfig, JobId, JobListing, ScrapeOutcome, ScrapeRequest, ScrapeResult, ScrapingConfig,
    SearchSession, SessionState, SessionStats, Timestamp,
};
use jobhound_qualifier::{QualificationScorer, ScoringPool};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Everything one scrape accumulates. Owned by the run and handed back as
/// the [`ScrapeResult`].
struct RunState {
    session: SearchSession,
    stats: SessionStats,
    jobs: Vec<JobListing>,
    seen: HashSet<JobId>,
    captcha_events: Vec<CaptchaEvent>,
    captcha_required: bool,
}

impl RunState {
    fn new(request: &ScrapeRequest) -> Self {
        Self {
            session: SearchSession::new(request),
            stats: SessionStats::default(),
            jobs: Vec::new(),
            seen: HashSet::new(),
            captcha_events: Vec::new(),
            captcha_required: false,
        }
    }
}

/// Drives one search session: navigation, filters, cards, pagination.
pub struct ScrapeOrchestrator {
    /// Browser session, closed exactly once when the scrape ends
    session: BrowserSession,
    /// Selector candidates for every field
    catalog: Arc<SelectorCatalog>,
    scraping: ScrapingConfig,
    filters: FilterConfig,
    extraction: ExtractionConfig,
    captcha: CaptchaMonitor,
    validator: ListingValidator,
    scorer: QualificationScorer,
    profile: CandidateProfile,
    /// Concurrent scoring calls
    workers: usize,
    cancel: CancellationToken,
    today: Option<NaiveDate>,
}

impl ScrapeOrchestrator {
    /// Create an orchestrator over an open browser session.
    ///
    /// Scoring is disabled until [`ScrapeOrchestrator::with_scorer`] is used;
    /// every listing then gets an `Unscored` qualification.
    #[must_use]
    pub fn new(session: BrowserSession, catalog: Arc<SelectorCatalog>, config: &AppConfig) -> Self {
        Self {
            session,
            catalog,
            scraping: config.scraping.clone(),
            filters: config.filters.clone(),
            extraction: config.extraction.clone(),
            captcha: CaptchaMonitor::new(&config.captcha),
            validator: ListingValidator::new(config.extraction.min_description_chars),
            scorer: QualificationScorer::from_config(None, &config.qualification),
            profile: CandidateProfile::default(),
            workers: config.qualification.workers,
            cancel: CancellationToken::new(),
            today: None,
        }
    }

    /// Score listings against `profile` with `scorer`.
    #[must_use]
    pub fn with_scorer(mut self, scorer: QualificationScorer, profile: CandidateProfile) -> Self {
        self.scorer = scorer;
        self.profile = profile;
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Pin the date relative posting ages are resolved against.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Handle for signalling that a challenge was solved by hand.
    #[must_use]
    pub fn captcha_handle(&self) -> CaptchaHandle {
        self.captcha.handle()
    }

    /// Token that cancels the scrape.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the scrape.
    ///
    /// Returns `Err` only for a request that cannot start. Session-level
    /// failures end the run with [`ScrapeOutcome::Failed`] and whatever was
    /// collected so far. The browser session is closed on every path.
    pub async fn scrape(self, request: ScrapeRequest) -> Result<ScrapeResult> {
        let url = match request
            .validate()
            .map_err(|e| ScrapeError::InvalidRequest(e.to_string()))
            .and_then(|()| {
                build_search_url(
                    &self.scraping.search_url_template,
                    &request.keywords,
                    &request.location,
                )
            }) {
            Ok(url) => url,
            Err(e) => {
                self.close_session().await;
                return Err(e);
            }
        };

        let cancel = self.cancel.child_token();
        let deadline = request.deadline.map(|budget| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(budget).await;
                warn!(budget_secs = budget.as_secs(), "Scrape deadline reached, cancelling");
                cancel.cancel();
            })
        });

        let mut pool = ScoringPool::spawn(
            self.scorer.clone().with_cancellation(cancel.clone()),
            self.profile.clone(),
            self.workers,
        );
        let mut run = RunState::new(&request);

        info!(
            session = %run.session.id(),
            keywords = %request.keywords,
            location = %request.location,
            max_jobs = request.max_jobs,
            filters = request.filters.len(),
            "Starting scrape"
        );

        let outcome = match self.execute(&mut run, &mut pool, &url, &request, &cancel).await {
            Ok(()) => match run.session.transition(SessionState::Completed) {
                Ok(()) => ScrapeOutcome::Completed,
                Err(e) => self.fail(&mut run, ScrapeError::from(e)),
            },
            Err(e) => self.fail(&mut run, e),
        };

        if let Some(deadline) = deadline {
            deadline.abort();
        }
        self.close_session().await;
        let qualifications = pool.finish().await;

        info!(
            session = %run.session.id(),
            found = run.stats.found,
            processed = run.stats.processed,
            extracted = run.stats.extracted,
            panel_failures = run.stats.panel_failures,
            errors = run.stats.errors,
            duplicates = run.stats.duplicates,
            outcome = ?outcome,
            "Scrape finished"
        );

        Ok(ScrapeResult {
            session_id: run.session.id(),
            jobs: run.jobs,
            qualifications,
            stats: run.stats,
            captcha_required: run.captcha_required,
            captcha_events: run.captcha_events,
            outcome,
            started_at: run.session.started_at(),
            finished_at: Timestamp::now(),
        })
    }

    fn fail(&self, run: &mut RunState, error: ScrapeError) -> ScrapeOutcome {
        error!(session = %run.session.id(), "Scrape failed: {}", error);
        if let Err(e) = run.session.transition(SessionState::Failed) {
            debug!("session already terminal: {}", e);
        }
        ScrapeOutcome::Failed {
            reason: error.to_failure_reason(),
        }
    }

    async fn close_session(&self) {
        if let Err(e) = self.session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }

    fn driver(&self) -> &dyn BrowserActions {
        self.session.driver()
    }

    async fn execute(
        &self,
        run: &mut RunState,
        pool: &mut ScoringPool,
        url: &str,
        request: &ScrapeRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        run.session.transition(SessionState::Navigating)?;
        self.open(url, cancel).await?;
        self.checkpoint(run, cancel).await?;

        if !request.filters.is_empty() {
            run.session.transition(SessionState::FilterApplying)?;
            self.apply_filters(run, request, cancel).await?;
        }

        run.session.transition(SessionState::Scraping)?;
        self.scrape_pages(run, pool, request.max_jobs, cancel).await
    }

    async fn open(&self, url: &str, cancel: &CancellationToken) -> Result<()> {
        match self.session.open(url, cancel).await {
            Ok(()) => Ok(()),
            Err(_) if cancel.is_cancelled() => Err(ScrapeError::Cancelled),
            Err(e) if e.is_navigation_timeout() => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                attempts: self.session.navigation_attempts(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_filters(
        &self,
        run: &mut RunState,
        request: &ScrapeRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let applier = FilterApplier::new(
            self.driver(),
            &self.catalog,
            self.filters.mutation_timeout_ms,
            BroadeningPolicy::from(self.filters.broadening),
        );

        for spec in &mut request.filters.clone() {
            if !self.session.pace(cancel).await {
                return Err(ScrapeError::Cancelled);
            }
            let outcome = applier.apply(spec, cancel).await;
            run.stats.filters.push(outcome.report());
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }
            self.checkpoint(run, cancel).await?;
        }
        Ok(())
    }

    async fn scrape_pages(
        &self,
        run: &mut RunState,
        pool: &mut ScoringPool,
        max_jobs: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let extractor = PanelExtractor::new(
            self.driver(),
            &self.catalog,
            self.extraction.panel_timeout_ms,
            self.extraction.stale_retry(),
        );
        let today = self.today.unwrap_or_else(|| Utc::now().date_naive());

        loop {
            run.stats.pages_visited += 1;
            let Some(selector) = self.card_selector().await? else {
                info!(page = run.session.page_cursor(), "No result cards on page");
                return Ok(());
            };
            let count = match self.driver().count(&selector).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(
                        page = run.session.page_cursor(),
                        "Card count failed, ending pagination: {}", e
                    );
                    fatal_only(e)?;
                    return Ok(());
                }
            };
            run.stats.found += count;
            info!(page = run.session.page_cursor(), cards = count, "Processing result page");

            for index in 0..count {
                if run.jobs.len() >= max_jobs {
                    info!(max_jobs, "Job cap reached");
                    return Ok(());
                }
                if cancel.is_cancelled() || !self.session.pace(cancel).await {
                    return Err(ScrapeError::Cancelled);
                }

                run.stats.processed += 1;
                let card = CardRef {
                    selector: selector.clone(),
                    index,
                };
                match extractor.extract(&card, cancel).await {
                    Ok(result) => {
                        if result.mode() == ExtractionMode::CardFallback {
                            run.stats.panel_failures += 1;
                        }
                        let mut parts = result.into_parts(today);
                        self.validator.apply(&mut parts);
                        record(run, pool, JobListing::new(parts));
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        run.stats.errors += 1;
                        warn!(card = index, "Card skipped: {}", e);
                    }
                }

                if cancel.is_cancelled() {
                    return Err(ScrapeError::Cancelled);
                }
                self.checkpoint(run, cancel).await?;
            }

            if run.jobs.len() >= max_jobs {
                info!(max_jobs, "Job cap reached");
                return Ok(());
            }
            if run.stats.pages_visited >= self.scraping.max_pages {
                info!(max_pages = self.scraping.max_pages, "Page cap reached");
                return Ok(());
            }
            if !self.session.pace(cancel).await {
                return Err(ScrapeError::Cancelled);
            }
            if !self.next_page().await? {
                info!("No further result pages");
                return Ok(());
            }
            run.session.advance_page();
            self.checkpoint(run, cancel).await?;
        }
    }

    /// First card selector with matches on the current page.
    async fn card_selector(&self) -> Result<Option<String>> {
        for candidate in self.catalog.candidates(FieldKind::ResultCard) {
            match self.driver().count(candidate).await {
                Ok(count) if count > 0 => return Ok(Some(candidate.clone())),
                Ok(_) => {}
                Err(e) => fatal_only(e)?,
            }
        }
        Ok(None)
    }

    /// Click the next-page control. `false` when there is none.
    async fn next_page(&self) -> Result<bool> {
        for candidate in self.catalog.candidates(FieldKind::NextPage) {
            match self.driver().exists(candidate).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    fatal_only(e)?;
                    continue;
                }
            }
            match self.driver().attribute(candidate, "disabled").await {
                Ok(Some(_)) => {
                    debug!(selector = %candidate, "next-page control disabled");
                    return Ok(false);
                }
                Ok(None) => {}
                Err(e) => {
                    fatal_only(e)?;
                    continue;
                }
            }

            if let Err(e) = self
                .driver()
                .watch_mutations(self.catalog.primary(FieldKind::ResultCard))
                .await
            {
                warn!("Could not watch the result list, paging blind: {}", e);
                fatal_only(e)?;
            }
            match self.driver().click(candidate).await {
                Ok(()) => {}
                Err(BrowserError::SessionClosed) => return Err(BrowserError::SessionClosed.into()),
                Err(e) => {
                    warn!(selector = %candidate, "Next-page click failed: {}", e);
                    continue;
                }
            }
            match self
                .driver()
                .wait_for_mutation(self.scraping.element_timeout_ms)
                .await
            {
                Ok(true) => {}
                Ok(false) => debug!("result list did not change after paging"),
                Err(e) => fatal_only(e)?,
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Look for a challenge or login wall and block on a challenge until it
    /// is resolved.
    async fn checkpoint(&self, run: &mut RunState, cancel: &CancellationToken) -> Result<()> {
        match self.captcha.inspect(self.driver()).await {
            PageCheck::Clear => Ok(()),
            PageCheck::LoginWall { url, signature } => {
                error!(url = %url, signature = %signature, "Login wall, credentials required");
                Err(ScrapeError::AuthenticationFailed { url })
            }
            PageCheck::Challenge { signature } => {
                warn!(signature = %signature, "Challenge detected, pausing scrape");
                run.captcha_required = true;
                run.stats.captcha_events += 1;
                run.session.pause()?;

                let mut event = CaptchaEvent::detected(signature.clone());
                let resolution = self
                    .captcha
                    .await_resolution(self.driver(), &mut event, cancel)
                    .await;
                run.captcha_events.push(event);

                match resolution {
                    Resolution::Resolved => {
                        run.session.resume()?;
                        Ok(())
                    }
                    Resolution::TimedOut => Err(ScrapeError::CaptchaUnresolved { signature }),
                    Resolution::Cancelled => Err(ScrapeError::Cancelled),
                }
            }
        }
    }
}

/// Keep a listing unless its id was already seen.
fn record(run: &mut RunState, pool: &mut ScoringPool, listing: JobListing) {
    if !run.seen.insert(listing.id().clone()) {
        run.stats.duplicates += 1;
        debug!(id = %listing.id(), title = %listing.title(), "duplicate listing skipped");
        return;
    }

    run.stats.extracted += 1;
    if listing.is_flagged() {
        run.stats.flagged += 1;
    }
    info!(
        id = %listing.id(),
        title = %listing.title(),
        company = %listing.company(),
        mode = ?listing.extraction_mode(),
        confidence = listing.extraction_confidence(),
        "Listing extracted"
    );
    pool.submit(listing.clone());
    run.jobs.push(listing);
}
