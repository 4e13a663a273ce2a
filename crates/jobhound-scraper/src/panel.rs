//! Detail-panel extraction for one result card.
//!
//! A card click updates a side panel in place. The extractor watches the
//! panel for that change, then reads every field through its ordered
//! selector candidates. When the panel never loads it keeps whatever the card
//! itself shows.

use chrono::NaiveDate;
use crate::dates::parse_posted;
use crate::error::{fatal_only, Result, ScrapeError};
use crate::selectors::SelectorCatalog;
use jobhound_browser::{BrowserActions, BrowserError};
use jobhound_core::types::normalize_url;
use jobhound_core::{
    ExperienceLevel, ExtractionMode, FieldKind, JobType, ListingParts, RetryPolicy,
    WorkArrangement,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Weight of a field resolved through its primary selector.
const PRIMARY_WEIGHT: f64 = 1.0;
/// Weight of a field resolved through a fallback selector.
const FALLBACK_WEIGHT: f64 = 0.6;
/// Ceiling for listings built from card fields only.
pub const CARD_FALLBACK_CEILING: f64 = 0.4;

/// One result card on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRef {
    /// Selector matching every card in the list
    pub selector: String,
    /// Zero-based position in the list
    pub index: usize,
}

/// Fields visible on the card itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub listing_url: Option<String>,
}

impl CardFields {
    fn is_empty(&self) -> bool {
        self.title.is_none() && self.company.is_none()
    }

    fn confidence(&self) -> f64 {
        let present = [
            self.title.is_some(),
            self.company.is_some(),
            self.location.is_some(),
            self.listing_url.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = present as f64 / 4.0;
        ratio * CARD_FALLBACK_CEILING
    }
}

/// A resolved field and the candidate that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub text: String,
    /// Position in the catalog's candidate list; 0 is the primary selector
    pub candidate: usize,
}

impl FieldValue {
    fn is_primary(&self) -> bool {
        self.candidate == 0
    }
}

/// Where applying for the job leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyTarget {
    /// In-platform quick-apply
    QuickApply,
    /// Off-site application form
    External(String),
    /// Neither marker was found
    Unknown,
}

/// Fields read from a loaded panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFields {
    pub title: Option<FieldValue>,
    pub company: Option<FieldValue>,
    pub location: Option<FieldValue>,
    pub description: Option<FieldValue>,
    pub insights: Option<FieldValue>,
    pub posted: Option<FieldValue>,
    /// `datetime` attribute of the posted-date element
    pub posted_datetime: Option<String>,
    pub apply: ApplyTarget,
}

impl PanelFields {
    fn get(&self, kind: FieldKind) -> Option<&FieldValue> {
        match kind {
            FieldKind::Title => self.title.as_ref(),
            FieldKind::Company => self.company.as_ref(),
            FieldKind::Location => self.location.as_ref(),
            FieldKind::Description => self.description.as_ref(),
            FieldKind::Insights => self.insights.as_ref(),
            FieldKind::PostedDate => self.posted.as_ref(),
            _ => None,
        }
    }

    fn confidence(&self) -> f64 {
        let total: f64 = FieldKind::PANEL_FIELDS
            .iter()
            .map(|kind| match self.get(*kind) {
                Some(v) if v.is_primary() => PRIMARY_WEIGHT,
                Some(_) => FALLBACK_WEIGHT,
                None => 0.0,
            })
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let count = FieldKind::PANEL_FIELDS.len() as f64;
        total / count
    }

    fn all_primary(&self) -> bool {
        FieldKind::PANEL_FIELDS
            .iter()
            .all(|kind| self.get(*kind).is_some_and(FieldValue::is_primary))
    }

    fn fallback_fields(&self) -> Vec<FieldKind> {
        FieldKind::PANEL_FIELDS
            .into_iter()
            .filter(|kind| self.get(*kind).is_some_and(|v| !v.is_primary()))
            .collect()
    }
}

/// What one card produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// Panel loaded and every panel field matched its primary selector
    Full { card: CardFields, panel: PanelFields },
    /// Panel loaded, some fields needed fallbacks or are missing
    PartialPanel { card: CardFields, panel: PanelFields },
    /// Panel did not load; card fields only
    CardFallback { card: CardFields },
}

impl ExtractionResult {
    pub fn mode(&self) -> ExtractionMode {
        match self {
            Self::Full { .. } => ExtractionMode::Full,
            Self::PartialPanel { .. } => ExtractionMode::PartialPanel,
            Self::CardFallback { .. } => ExtractionMode::CardFallback,
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Self::Full { panel, .. } | Self::PartialPanel { panel, .. } => panel.confidence(),
            Self::CardFallback { card } => card.confidence(),
        }
    }

    /// Flatten into listing parts. Panel values win over card values.
    pub fn into_parts(self, today: NaiveDate) -> ListingParts {
        let mode = self.mode();
        let confidence = self.confidence();
        let (card, panel) = match self {
            Self::Full { card, panel } | Self::PartialPanel { card, panel } => (card, Some(panel)),
            Self::CardFallback { card } => (card, None),
        };

        let Some(panel) = panel else {
            let arrangement = card.location.as_deref().and_then(WorkArrangement::detect);
            return ListingParts {
                application_url: card.listing_url.clone(),
                listing_url: card.listing_url,
                title: card.title.unwrap_or_default(),
                company: card.company.unwrap_or_default(),
                location: card.location,
                work_arrangement: arrangement,
                extraction_mode: Some(mode),
                extraction_confidence: confidence,
                ..ListingParts::default()
            };
        };

        let text = |v: &Option<FieldValue>| v.as_ref().map(|v| v.text.clone());
        let insights = text(&panel.insights).unwrap_or_default();
        let location = text(&panel.location).or_else(|| card.location.clone());
        let arrangement = WorkArrangement::detect(&insights)
            .or_else(|| location.as_deref().and_then(WorkArrangement::detect));
        let application_url = match &panel.apply {
            ApplyTarget::QuickApply => None,
            ApplyTarget::External(url) => Some(url.clone()),
            ApplyTarget::Unknown => card.listing_url.clone(),
        };

        ListingParts {
            listing_url: card.listing_url,
            title: text(&panel.title).or(card.title).unwrap_or_default(),
            company: text(&panel.company).or(card.company).unwrap_or_default(),
            location,
            description_raw: text(&panel.description),
            application_url,
            work_arrangement: arrangement,
            experience_level: ExperienceLevel::detect(&insights),
            job_type: JobType::detect(&insights),
            date_posted: parse_posted(
                panel.posted_datetime.as_deref(),
                panel.posted.as_ref().map(|v| v.text.as_str()),
                today,
            ),
            extraction_mode: Some(mode),
            extraction_confidence: confidence,
            fallback_fields: panel.fallback_fields(),
            flags: Vec::new(),
        }
    }
}

/// Outcome of reading a single selector.
enum Read {
    Found(String),
    Missing,
    /// Still stale after every retry
    Stale,
}

/// Reads the detail panel for one card at a time.
pub struct PanelExtractor<'a> {
    driver: &'a dyn BrowserActions,
    catalog: &'a SelectorCatalog,
    panel_timeout_ms: u64,
    stale_retry: RetryPolicy,
}

impl<'a> PanelExtractor<'a> {
    pub fn new(
        driver: &'a dyn BrowserActions,
        catalog: &'a SelectorCatalog,
        panel_timeout_ms: u64,
        stale_retry: RetryPolicy,
    ) -> Self {
        Self {
            driver,
            catalog,
            panel_timeout_ms,
            stale_retry,
        }
    }

    /// Click a card and read its panel.
    ///
    /// Only a closed session or a card with neither title nor company is an
    /// error; every other problem degrades the result.
    pub async fn extract(&self, card: &CardRef, cancel: &CancellationToken) -> Result<ExtractionResult> {
        if let Err(e) = self.driver.scroll_into_view(&card.selector, card.index).await {
            fatal_only(e)?;
        }
        let card_fields = self.card_fields(card, cancel).await?;

        let watched = self.panel_container().await?;
        let watch_target = watched
            .clone()
            .unwrap_or_else(|| self.catalog.primary(FieldKind::PanelContainer).to_string());
        if let Err(e) = self.driver.watch_mutations(&watch_target).await {
            fatal_only(e)?;
        }

        let clicked = self
            .stale_retry
            .run(Some(cancel), BrowserError::is_stale, |_| {
                self.driver.click_nth(&card.selector, card.index)
            })
            .await;
        if let Err(e) = clicked.result {
            fatal_only(e)?;
            warn!(card = card.index, "Card click failed, keeping card fields");
            return fallback(card, card_fields);
        }

        let mutated = match self.driver.wait_for_mutation(self.panel_timeout_ms).await {
            Ok(mutated) => mutated,
            Err(e) => {
                fatal_only(e)?;
                false
            }
        };

        let scope = self.panel_container().await?;
        let panel = self.panel_fields(scope.as_deref(), cancel).await?;

        let loaded = if mutated {
            panel.title.is_some() || panel.company.is_some()
        } else {
            // The panel may already show this card; trust it only when the
            // titles agree
            match (&panel.title, &card_fields.title) {
                (Some(p), Some(c)) => same_text(&p.text, c),
                _ => false,
            }
        };

        if !loaded {
            warn!(
                card = card.index,
                mutated, "Detail panel did not load, keeping card fields"
            );
            return fallback(card, card_fields);
        }

        let result = if panel.all_primary() {
            ExtractionResult::Full {
                card: card_fields,
                panel,
            }
        } else {
            ExtractionResult::PartialPanel {
                card: card_fields,
                panel,
            }
        };
        debug!(
            card = card.index,
            mode = ?result.mode(),
            confidence = result.confidence(),
            "card extracted"
        );
        Ok(result)
    }

    /// Resolve one panel field through its candidates, page-wide.
    pub async fn extract_field(
        &self,
        kind: FieldKind,
        cancel: &CancellationToken,
    ) -> Result<Option<FieldValue>> {
        self.first_text(None, kind, cancel).await
    }

    async fn card_fields(&self, card: &CardRef, cancel: &CancellationToken) -> Result<CardFields> {
        let scope = Some((card.selector.as_str(), card.index));
        let text = |v: Option<FieldValue>| v.map(|v| v.text);

        let title = text(self.first_text(scope, FieldKind::CardTitle, cancel).await?);
        let company = text(self.first_text(scope, FieldKind::CardCompany, cancel).await?);
        let location = text(self.first_text(scope, FieldKind::CardLocation, cancel).await?);

        let mut listing_url = None;
        for candidate in self.catalog.candidates(FieldKind::CardLink) {
            match self
                .driver
                .attribute_in(&card.selector, card.index, candidate, "href")
                .await
            {
                Ok(Some(href)) if !href.trim().is_empty() => {
                    listing_url = self.absolute(&href).await.map(|u| normalize_url(&u));
                    break;
                }
                Ok(_) => {}
                Err(e) => fatal_only(e)?,
            }
        }

        Ok(CardFields {
            title,
            company,
            location,
            listing_url,
        })
    }

    async fn panel_fields(
        &self,
        container: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<PanelFields> {
        let scope = container.map(|c| (c, 0));

        let posted = self.first_text(scope, FieldKind::PostedDate, cancel).await?;
        let posted_datetime = match &posted {
            Some(value) => {
                let selector = &self.catalog.candidates(FieldKind::PostedDate)[value.candidate];
                self.attribute(scope, selector, "datetime").await?
            }
            None => None,
        };

        Ok(PanelFields {
            title: self.first_text(scope, FieldKind::Title, cancel).await?,
            company: self.first_text(scope, FieldKind::Company, cancel).await?,
            location: self.first_text(scope, FieldKind::Location, cancel).await?,
            description: self.first_text(scope, FieldKind::Description, cancel).await?,
            insights: self.first_text(scope, FieldKind::Insights, cancel).await?,
            posted,
            posted_datetime,
            apply: self.apply_target(scope).await?,
        })
    }

    async fn apply_target(&self, scope: Option<(&str, usize)>) -> Result<ApplyTarget> {
        for candidate in self.catalog.candidates(FieldKind::QuickApply) {
            let selector = scoped(scope, candidate);
            match self.driver.exists(&selector).await {
                Ok(true) => return Ok(ApplyTarget::QuickApply),
                Ok(false) => {}
                Err(e) => fatal_only(e)?,
            }
        }
        for candidate in self.catalog.candidates(FieldKind::ApplyLink) {
            if let Some(href) = self.attribute(scope, candidate, "href").await? {
                if let Some(url) = self.absolute(&href).await {
                    return Ok(ApplyTarget::External(url));
                }
            }
        }
        Ok(ApplyTarget::Unknown)
    }

    /// First existing panel container candidate.
    async fn panel_container(&self) -> Result<Option<String>> {
        for candidate in self.catalog.candidates(FieldKind::PanelContainer) {
            match self.driver.exists(candidate).await {
                Ok(true) => return Ok(Some(candidate.clone())),
                Ok(false) => {}
                Err(e) => fatal_only(e)?,
            }
        }
        Ok(None)
    }

    async fn first_text(
        &self,
        scope: Option<(&str, usize)>,
        kind: FieldKind,
        cancel: &CancellationToken,
    ) -> Result<Option<FieldValue>> {
        for (candidate, selector) in self.catalog.candidates(kind).iter().enumerate() {
            match self.read_text(scope, selector, cancel).await? {
                Read::Found(text) => {
                    if candidate > 0 {
                        debug!(field = %kind, candidate, selector = %selector, "field resolved through fallback");
                    }
                    return Ok(Some(FieldValue { text, candidate }));
                }
                Read::Missing => {}
                Read::Stale => {
                    warn!(field = %kind, selector = %selector, "Element stayed stale, giving up on field");
                    return Ok(None);
                }
            }
        }
        Ok(None)
    }

    async fn read_text(
        &self,
        scope: Option<(&str, usize)>,
        selector: &str,
        cancel: &CancellationToken,
    ) -> Result<Read> {
        let outcome = self
            .stale_retry
            .run(Some(cancel), BrowserError::is_stale, |_| async move {
                match scope {
                    Some((container, index)) => self.driver.text_in(container, index, selector).await,
                    None => self.driver.extract_text(selector).await,
                }
            })
            .await;

        match outcome.result {
            Ok(text) if !text.trim().is_empty() => Ok(Read::Found(text.trim().to_string())),
            Ok(_) => Ok(Read::Missing),
            Err(e) if e.is_stale() => Ok(Read::Stale),
            Err(e) => {
                fatal_only(e)?;
                Ok(Read::Missing)
            }
        }
    }

    async fn attribute(
        &self,
        scope: Option<(&str, usize)>,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>> {
        let value = match scope {
            Some((container, index)) => {
                self.driver
                    .attribute_in(container, index, selector, name)
                    .await
            }
            None => self.driver.attribute(selector, name).await,
        };
        match value {
            Ok(v) => Ok(v.filter(|v| !v.trim().is_empty())),
            Err(e) => {
                fatal_only(e)?;
                Ok(None)
            }
        }
    }

    /// Resolve a possibly relative href against the page URL.
    async fn absolute(&self, href: &str) -> Option<String> {
        if let Ok(url) = url::Url::parse(href) {
            return Some(url.to_string());
        }
        let base = self.driver.current_url().await.ok()?;
        url::Url::parse(&base)
            .and_then(|base| base.join(href))
            .map(|u| u.to_string())
            .ok()
    }
}

fn fallback(card: &CardRef, fields: CardFields) -> Result<ExtractionResult> {
    if fields.is_empty() {
        return Err(ScrapeError::EmptyCard { index: card.index });
    }
    Ok(ExtractionResult::CardFallback { card: fields })
}

/// Swallow element-level errors; a closed session ends the card.
fn scoped(scope: Option<(&str, usize)>, selector: &str) -> String {
    match scope {
        Some((container, _)) => format!("{container} {selector}"),
        None => selector.to_string(),
    }
}

fn same_text(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    norm(a) == norm(b)
}
