//! End-to-end scrapes against scripted fixture pages.

use async_trait::async_trait;
use chrono::NaiveDate;
use jobhound_browser::{ActionPacer, BrowserActions, BrowserError, BrowserSession, FixturePage, SharedDriver};
use jobhound_core::{
    AppConfig, AppliedState, CandidateProfile, CaptchaStatus, ExtractionMode, FailureReason,
    FilterSpec, JobType, QualificationBands, QualificationStatus, RetryPolicy, ScrapeOutcome,
    ScrapeRequest,
};
use jobhound_qualifier::{QualificationScorer, ScoringProvider, ScoringRequest, ScoringResponse};
use jobhound_scraper::{ScrapeError, ScrapeOrchestrator, SelectorCatalog};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const CARD: &str = "li.jobs-search-results__list-item";
const NEXT: &str = "button[aria-label='View next page']";
const SEARCH: &str = "https://jobs.example.com/jobs/search";

#[derive(Clone)]
struct Job {
    href: String,
    title: &'static str,
    company: &'static str,
    /// Whether clicking the card loads its panel
    loads: bool,
}

fn job(id: u32, title: &'static str, company: &'static str) -> Job {
    Job {
        href: format!("/jobs/view/{id}/"),
        title,
        company,
        loads: true,
    }
}

fn card_html(job: &Job) -> String {
    format!(
        r#"<li class="jobs-search-results__list-item">
             <a class="job-card-container__link" href="{href}"><span class="job-card-list__title">{title}</span></a>
             <span class="job-card-container__primary-description">{company}</span>
             <span class="job-card-container__metadata-item">Berlin, Germany</span>
           </li>"#,
        href = job.href,
        title = job.title,
        company = job.company,
    )
}

fn panel_html(job: &Job) -> String {
    format!(
        r#"<div class="jobs-search__job-details--container">
             <div class="job-details-jobs-unified-top-card__job-title"><h1>{title}</h1></div>
             <div class="job-details-jobs-unified-top-card__company-name"><a>{company}</a></div>
             <div class="job-details-jobs-unified-top-card__primary-description-container"><span class="tvm__text">Berlin, Germany</span><time datetime="2025-03-12">3 days ago</time></div>
             <div class="job-details-preferences-and-skills">Hybrid Full-time</div>
             <a class="jobs-apply-button" href="https://careers.example.org{href}">Apply</a>
             <div id="job-details">{company} is hiring a {title} to work on distributed systems written in Rust.</div>
           </div>"#,
        title = job.title,
        company = job.company,
        href = job.href,
    )
}

fn site(pages: &[Vec<Job>]) -> FixturePage {
    site_on(FixturePage::new(), pages)
}

/// A paginated result list. State `p{page}` is the bare list and
/// `p{page}_j{index}` the list with card `index`'s panel open. Routes and
/// click rules already on `fixture` take precedence.
fn site_on(fixture: FixturePage, pages: &[Vec<Job>]) -> FixturePage {
    let mut fixture = fixture.route(SEARCH, "p0");

    for (p, jobs) in pages.iter().enumerate() {
        let has_next = p + 1 < pages.len();
        let mut list: String = jobs.iter().map(card_html).collect();
        list = format!("<ul>{list}</ul>");
        if has_next {
            list.push_str(r#"<button aria-label="View next page">Next</button>"#);
        }

        let mut states = vec![format!("p{p}")];
        fixture = fixture.with_state(&format!("p{p}"), list.clone());
        for (i, job) in jobs.iter().enumerate() {
            let name = format!("p{p}_j{i}");
            fixture = fixture.with_state(&name, format!("{list}{}", panel_html(job)));
            states.push(name);
        }

        for from in &states {
            for (i, job) in jobs.iter().enumerate() {
                if job.loads {
                    fixture = fixture.on_click_nth(from, CARD, i, &format!("p{p}_j{i}"));
                }
            }
            if has_next {
                fixture = fixture.on_click(from, NEXT, &format!("p{}", p + 1));
            }
        }
    }
    fixture
}

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.scraping.search_url_template = format!("{SEARCH}?keywords={{keywords}}&location={{location}}");
    config.scraping.max_pages = 5;
    config.extraction.stale_backoff_ms = 1;
    config.captcha.resolution_timeout_secs = 60;
    config
}

fn orchestrator(page: &Arc<FixturePage>, config: &AppConfig) -> ScrapeOrchestrator {
    orchestrator_on(page.clone(), config)
}

fn orchestrator_on(driver: SharedDriver, config: &AppConfig) -> ScrapeOrchestrator {
    let session = BrowserSession::new(
        driver,
        ActionPacer::disabled(),
        RetryPolicy::fixed(3, Duration::from_millis(10)),
    );
    ScrapeOrchestrator::new(session, Arc::new(SelectorCatalog::builtin()), config)
        .with_today(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap())
}

fn request() -> ScrapeRequest {
    ScrapeRequest::new("rust engineer", "Berlin")
}

#[tokio::test]
async fn test_scrape_collects_every_card() {
    let page = Arc::new(site(&[vec![
        job(1, "Senior Rust Engineer", "Ferrous Systems"),
        job(2, "Platform Engineer", "Acme"),
    ]]));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.stats.found, 2);
    assert_eq!(result.stats.processed, 2);
    assert_eq!(result.stats.extracted, 2);
    assert_eq!(result.stats.pages_visited, 1);
    assert!(!result.captcha_required);

    let first = &result.jobs[0];
    assert_eq!(first.title(), "Senior Rust Engineer");
    assert_eq!(first.extraction_mode(), ExtractionMode::Full);
    assert_eq!(
        first.application_url(),
        Some("https://careers.example.org/jobs/view/1/")
    );
    assert_eq!(first.date_posted(), NaiveDate::from_ymd_opt(2025, 3, 12));

    // No provider configured: every listing is unscored, none dropped
    assert_eq!(result.qualifications.len(), 2);
    assert!(result
        .qualifications
        .iter()
        .all(|q| q.status == QualificationStatus::Unscored));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["outcome"]["status"], "completed");
    assert_eq!(json["jobs"].as_array().map(Vec::len), Some(2));

    assert_eq!(page.navigation_log().len(), 1);
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn test_same_normalized_url_is_kept_once() {
    let mut twin = job(7, "Senior Rust Engineer", "Ferrous Systems");
    twin.href = "/jobs/view/7/?trk=public_jobs".to_string();
    let page = Arc::new(site(&[vec![
        job(7, "Senior Rust Engineer", "Ferrous Systems"),
        twin,
    ]]));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.jobs.len(), 1);
    assert_eq!(result.stats.processed, 2);
    assert_eq!(result.stats.extracted, 1);
    assert_eq!(result.stats.duplicates, 1);
    assert_eq!(result.qualifications.len(), 1);
}

#[tokio::test]
async fn test_identical_text_with_different_urls_stays_distinct() {
    let page = Arc::new(site(&[vec![
        job(11, "Rust Engineer", "Acme"),
        job(12, "Rust Engineer", "Acme"),
    ]]));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.jobs.len(), 2);
    assert_ne!(result.jobs[0].id(), result.jobs[1].id());
    assert_eq!(result.stats.duplicates, 0);
}

#[tokio::test]
async fn test_unloaded_panel_keeps_card_fields() {
    let mut stuck = job(22, "Backend Engineer", "Initech");
    stuck.loads = false;
    let page = Arc::new(site(&[vec![job(21, "Rust Engineer", "Acme"), stuck]]));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.stats.panel_failures, 1);
    let fallback = &result.jobs[1];
    assert_eq!(fallback.extraction_mode(), ExtractionMode::CardFallback);
    assert_eq!(fallback.title(), "Backend Engineer");
    assert!(fallback.extraction_confidence() <= 0.4);
}

#[tokio::test]
async fn test_paginates_until_job_cap() {
    let page = Arc::new(site(&[
        vec![job(1, "Rust Engineer", "Acme"), job(2, "Go Engineer", "Initech")],
        vec![job(3, "Data Engineer", "Globex"), job(4, "SRE", "Hooli")],
    ]));

    let result = orchestrator(&page, &config())
        .scrape(request().with_max_jobs(3))
        .await
        .unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 3);
    assert_eq!(result.jobs[2].title(), "Data Engineer");
    assert_eq!(result.stats.pages_visited, 2);
    assert_eq!(page.current_state().as_deref(), Some("p1_j0"));
}

#[tokio::test]
async fn test_page_cap_stops_pagination() {
    let page = Arc::new(site(&[
        vec![job(1, "Rust Engineer", "Acme")],
        vec![job(2, "Go Engineer", "Initech")],
    ]));
    let mut config = config();
    config.scraping.max_pages = 1;

    let result = orchestrator(&page, &config).scrape(request()).await.unwrap();

    assert_eq!(result.jobs.len(), 1);
    assert_eq!(result.stats.pages_visited, 1);
    assert!(!page.click_log().iter().any(|c| c.starts_with(NEXT)));
}

#[tokio::test]
async fn test_failed_filter_does_not_stop_scrape() {
    let page = Arc::new(site(&[vec![job(1, "Rust Engineer", "Acme")]]));

    let result = orchestrator(&page, &config())
        .scrape(request().with_filter(FilterSpec::job_type(JobType::Contract)))
        .await
        .unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 1);
    assert_eq!(result.stats.filters.len(), 1);
    assert_eq!(result.stats.filters[0].state, AppliedState::Failed);
    assert_eq!(result.stats.failed_filters(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_pauses_until_resolved() {
    let jobs = vec![
        job(1, "Rust Engineer", "Acme"),
        job(2, "Go Engineer", "Initech"),
    ];
    let challenge = format!(
        "<ul>{}{}</ul>{}<div id=\"captcha-internal\"></div>",
        card_html(&jobs[0]),
        card_html(&jobs[1]),
        panel_html(&jobs[0])
    );
    // Clicking the first card trips a challenge
    let page = Arc::new(site_on(
        FixturePage::new()
            .with_state("challenge", challenge)
            .on_click_nth("p0", CARD, 0, "challenge"),
        &[jobs],
    ));

    let orchestrator = orchestrator(&page, &config());
    let handle = orchestrator.captcha_handle();
    let fixture = Arc::clone(&page);
    let resolver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        // Still paused: the second card has not been clicked
        assert_eq!(
            fixture.click_log(),
            vec![format!("{CARD}[0]")],
            "no card clicks while paused"
        );
        fixture.set_state("p0_j0");
        handle.resolve();
    });

    let result = orchestrator.scrape(request()).await.unwrap();
    resolver.await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert!(result.captcha_required);
    assert_eq!(result.stats.captcha_events, 1);
    assert_eq!(result.captcha_events.len(), 1);
    assert_eq!(result.captcha_events[0].status(), CaptchaStatus::Resolved);
    assert_eq!(result.captcha_events[0].signature_matched(), "dom:#captcha-internal");
    // Remaining cards were processed after resolution
    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.jobs[1].title(), "Go Engineer");
}

#[tokio::test(start_paused = true)]
async fn test_unresolved_challenge_fails_with_partial_results() {
    let jobs = vec![job(1, "Rust Engineer", "Acme"), job(2, "Go Engineer", "Initech")];
    let challenge = format!(
        "<ul>{}</ul>{}<iframe src=\"https://www.google.com/recaptcha/api2\"></iframe>",
        card_html(&jobs[0]),
        panel_html(&jobs[0])
    );
    let page = Arc::new(site_on(
        FixturePage::new()
            .with_state("challenge", challenge)
            .on_click_nth("p0", CARD, 0, "challenge"),
        &[jobs],
    ));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert!(matches!(
        result.outcome,
        ScrapeOutcome::Failed {
            reason: FailureReason::CaptchaUnresolved { .. }
        }
    ));
    assert_eq!(result.captcha_events[0].status(), CaptchaStatus::Abandoned);
    // The card extracted before the challenge is kept
    assert_eq!(result.jobs.len(), 1);
    assert_eq!(page.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_challenge_wait() {
    let jobs = vec![job(1, "Rust Engineer", "Acme")];
    let challenge = format!(
        "<ul>{}</ul><div id=\"captcha-internal\"></div>",
        card_html(&jobs[0])
    );
    // The challenge is up as soon as the search page loads
    let page = Arc::new(site_on(
        FixturePage::new()
            .with_state("challenge", challenge)
            .route(SEARCH, "challenge"),
        &[jobs],
    ));
    let mut config = config();
    config.captcha.resolution_timeout_secs = 300;

    let result = orchestrator(&page, &config)
        .scrape(request().with_deadline(Duration::from_secs(30)))
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        ScrapeOutcome::Failed {
            reason: FailureReason::Cancelled
        }
    );
    assert_eq!(result.captcha_events[0].status(), CaptchaStatus::Abandoned);
    assert!(page.click_log().is_empty());
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn test_external_cancel_stops_before_cards() {
    let page = Arc::new(site(&[vec![job(1, "Rust Engineer", "Acme")]]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator(&page, &config())
        .with_cancellation(cancel)
        .scrape(request())
        .await
        .unwrap();

    assert_eq!(
        result.outcome,
        ScrapeOutcome::Failed {
            reason: FailureReason::Cancelled
        }
    );
    assert!(result.jobs.is_empty());
    assert!(page.click_log().is_empty());
    assert_eq!(page.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeouts_fail_session() {
    let page = Arc::new(site(&[vec![job(1, "Rust Engineer", "Acme")]]).with_navigation_timeouts(3));

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    match result.outcome {
        ScrapeOutcome::Failed {
            reason: FailureReason::NavigationTimeout { url, attempts },
        } => {
            assert!(url.starts_with(SEARCH));
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(page.navigation_log().len(), 3);
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn test_login_wall_is_authentication_failure() {
    let page = Arc::new(
        FixturePage::new()
            .with_state_at(
                "authwall",
                "https://jobs.example.com/authwall?trk=guest",
                r#"<form class="login__form"><input id="session_password"></form>"#,
            )
            .route(SEARCH, "authwall"),
    );

    let result = orchestrator(&page, &config()).scrape(request()).await.unwrap();

    assert!(matches!(
        result.outcome,
        ScrapeOutcome::Failed {
            reason: FailureReason::AuthenticationFailed { ref url }
        } if url.contains("/authwall")
    ));
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_and_session_closed() {
    let page = Arc::new(site(&[vec![job(1, "Rust Engineer", "Acme")]]));

    let err = orchestrator(&page, &config())
        .scrape(ScrapeRequest::new("  ", "Berlin"))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::InvalidRequest(_)));
    assert!(page.navigation_log().is_empty());
    assert_eq!(page.close_count(), 1);
}

struct FixedScore(u8);

#[async_trait]
impl ScoringProvider for FixedScore {
    async fn score(&self, request: &ScoringRequest) -> jobhound_qualifier::Result<ScoringResponse> {
        assert!(request.listing_text.contains("Rust Engineer"));
        Ok(ScoringResponse {
            score: self.0,
            reasoning: "Strong Rust background".to_string(),
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[tokio::test]
async fn test_listings_are_scored_while_scraping() {
    let page = Arc::new(site(&[vec![
        job(1, "Rust Engineer", "Acme"),
        job(2, "Senior Rust Engineer", "Initech"),
    ]]));
    let scorer = QualificationScorer::new(
        Some(Arc::new(FixedScore(78))),
        RetryPolicy::no_retry(),
        QualificationBands::default(),
    );

    let result = orchestrator(&page, &config())
        .with_scorer(scorer, CandidateProfile::new("Five years of Rust"))
        .scrape(request())
        .await
        .unwrap();

    assert_eq!(result.qualifications.len(), 2);
    for (job, qualification) in result.jobs.iter().zip(&result.qualifications) {
        assert_eq!(&qualification.job_id, job.id());
        assert_eq!(qualification.status, QualificationStatus::Qualified);
        assert_eq!(qualification.reasoning, "Strong Rust background");
    }
    assert!(result.qualification_for(result.jobs[0].id()).is_some());
}

/// Error injected for an operation on a selector, given the page state.
type Fault = fn(op: &str, selector: &str, page: &FixturePage) -> Option<BrowserError>;

/// Fixture driver that fails selected operations.
struct FaultyDriver {
    page: Arc<FixturePage>,
    fault: Fault,
}

impl FaultyDriver {
    fn new(page: &Arc<FixturePage>, fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            page: Arc::clone(page),
            fault,
        })
    }

    fn check(&self, op: &str, selector: &str) -> jobhound_browser::Result<()> {
        match (self.fault)(op, selector, &self.page) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BrowserActions for FaultyDriver {
    async fn navigate(&self, url: &str) -> jobhound_browser::Result<()> {
        self.page.navigate(url).await
    }

    async fn current_url(&self) -> jobhound_browser::Result<String> {
        self.page.current_url().await
    }

    async fn count(&self, selector: &str) -> jobhound_browser::Result<usize> {
        self.check("count", selector)?;
        self.page.count(selector).await
    }

    async fn click_nth(&self, selector: &str, index: usize) -> jobhound_browser::Result<()> {
        self.check("click", selector)?;
        self.page.click_nth(selector, index).await
    }

    async fn scroll_into_view(&self, selector: &str, index: usize) -> jobhound_browser::Result<()> {
        self.page.scroll_into_view(selector, index).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> jobhound_browser::Result<()> {
        self.page.wait_for_selector(selector, timeout_ms).await
    }

    async fn watch_mutations(&self, selector: &str) -> jobhound_browser::Result<()> {
        self.check("watch_mutations", selector)?;
        self.page.watch_mutations(selector).await
    }

    async fn wait_for_mutation(&self, timeout_ms: u64) -> jobhound_browser::Result<bool> {
        self.page.wait_for_mutation(timeout_ms).await
    }

    async fn extract_text(&self, selector: &str) -> jobhound_browser::Result<String> {
        self.page.extract_text(selector).await
    }

    async fn text_in(&self, scope: &str, index: usize, selector: &str) -> jobhound_browser::Result<String> {
        self.page.text_in(scope, index, selector).await
    }

    async fn attribute(&self, selector: &str, name: &str) -> jobhound_browser::Result<Option<String>> {
        self.check("attribute", selector)?;
        self.page.attribute(selector, name).await
    }

    async fn attribute_in(
        &self,
        scope: &str,
        index: usize,
        selector: &str,
        name: &str,
    ) -> jobhound_browser::Result<Option<String>> {
        self.page.attribute_in(scope, index, selector, name).await
    }

    async fn close(&self) -> jobhound_browser::Result<()> {
        self.page.close().await
    }
}

fn two_pages() -> Arc<FixturePage> {
    Arc::new(site(&[
        vec![job(1, "Rust Engineer", "Acme"), job(2, "Go Engineer", "Initech")],
        vec![job(3, "Data Engineer", "Globex"), job(4, "SRE", "Hooli")],
    ]))
}

#[tokio::test]
async fn test_failed_result_list_watch_keeps_paging() {
    let page = two_pages();
    let driver = FaultyDriver::new(&page, |op, selector, _| {
        (op == "watch_mutations" && selector == CARD)
            .then(|| BrowserError::Timeout("evaluate".to_string()))
    });

    let result = orchestrator_on(driver, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 4);
    assert_eq!(result.stats.pages_visited, 2);
    assert_eq!(result.stats.errors, 0);
    assert_eq!(page.close_count(), 1);
}

#[tokio::test]
async fn test_unreadable_next_page_control_is_skipped() {
    let page = two_pages();
    // The primary next-page control cannot be read; no fallback control exists
    let driver = FaultyDriver::new(&page, |op, selector, _| {
        (op == "attribute" && selector == NEXT)
            .then(|| BrowserError::ChromiumError("evaluate failed".to_string()))
    });

    let result = orchestrator_on(driver, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.stats.pages_visited, 1);
}

#[tokio::test]
async fn test_failed_card_count_ends_pagination() {
    let page = two_pages();
    let driver = FaultyDriver::new(&page, |op, selector, page| {
        let second_page = page
            .current_state()
            .is_some_and(|state| state.starts_with("p1"));
        (op == "count" && selector == CARD && second_page)
            .then(|| BrowserError::Timeout("evaluate".to_string()))
    });

    let result = orchestrator_on(driver, &config()).scrape(request()).await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.stats.pages_visited, 2);
}

#[tokio::test]
async fn test_closed_session_while_paging_fails_scrape() {
    let page = two_pages();
    let driver = FaultyDriver::new(&page, |op, selector, _| {
        (op == "watch_mutations" && selector == CARD).then_some(BrowserError::SessionClosed)
    });

    let result = orchestrator_on(driver, &config()).scrape(request()).await.unwrap();

    assert!(matches!(
        result.outcome,
        ScrapeOutcome::Failed {
            reason: FailureReason::Browser { .. }
        }
    ));
    assert_eq!(result.jobs.len(), 2);
}

/// Records when each listing finished scoring.
struct TimedScore {
    scored: Arc<Mutex<Vec<(String, Instant)>>>,
}

#[async_trait]
impl ScoringProvider for TimedScore {
    async fn score(&self, request: &ScoringRequest) -> jobhound_qualifier::Result<ScoringResponse> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let title = request
            .listing_text
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        self.scored.lock().unwrap().push((title, Instant::now()));
        Ok(ScoringResponse {
            score: 80,
            reasoning: String::new(),
        })
    }

    fn name(&self) -> &str {
        "timed"
    }
}

#[tokio::test(start_paused = true)]
async fn test_scoring_continues_while_challenge_pauses_scraping() {
    let jobs = vec![
        job(1, "Rust Engineer", "Acme"),
        job(2, "Go Engineer", "Initech"),
    ];
    let challenge = format!(
        "<ul>{}{}</ul>{}<div id=\"captcha-internal\"></div>",
        card_html(&jobs[0]),
        card_html(&jobs[1]),
        panel_html(&jobs[0])
    );
    let page = Arc::new(site_on(
        FixturePage::new()
            .with_state("challenge", challenge)
            .on_click_nth("p0", CARD, 0, "challenge"),
        &[jobs],
    ));

    let scored = Arc::new(Mutex::new(Vec::new()));
    let scorer = QualificationScorer::new(
        Some(Arc::new(TimedScore {
            scored: Arc::clone(&scored),
        })),
        RetryPolicy::no_retry(),
        QualificationBands::default(),
    );
    let orchestrator = orchestrator(&page, &config())
        .with_scorer(scorer, CandidateProfile::new("Five years of Rust"));

    let handle = orchestrator.captcha_handle();
    let fixture = Arc::clone(&page);
    let resolver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        fixture.set_state("p0_j0");
        let resolved_at = Instant::now();
        handle.resolve();
        resolved_at
    });

    let result = orchestrator.scrape(request()).await.unwrap();
    let resolved_at = resolver.await.unwrap();

    assert_eq!(result.outcome, ScrapeOutcome::Completed);
    assert_eq!(result.jobs.len(), 2);
    assert_eq!(result.qualifications.len(), 2);

    let scored = scored.lock().unwrap().clone();
    assert_eq!(scored.len(), 2);
    assert!(scored[0].0.contains("Rust Engineer"));
    assert!(scored[0].1 < resolved_at, "first listing scored during the pause");
    assert!(scored[1].0.contains("Go Engineer"));
    assert!(scored[1].1 > resolved_at);
}
