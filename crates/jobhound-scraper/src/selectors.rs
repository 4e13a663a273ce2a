//! Typed selector catalog: ordered fallback candidates per semantic field
//! and the controls used to drive each search filter.
//!
//! The built-in table targets the current job-search markup. Every
//! [`FieldKind`] must have at least one candidate and every candidate must
//! parse as CSS; both are checked when the catalog is built, so a missing or
//! malformed entry fails at startup rather than mid-scrape.

use crate::error::{Result, ScrapeError};
use jobhound_core::{
    ExperienceLevel, FieldKind, FilterKind, FilterValue, JobType, WorkArrangement,
};
use scraper::Selector;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Selectors that drive one filter in the search UI.
///
/// `options` and `active` are templates; `{label}`, `{code}` and `{days}`
/// are substituted from the requested [`FilterValue`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterControls {
    /// Buttons that open the filter's dropdown, tried in order
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Option templates, tried in order
    pub options: Vec<String>,
    /// Buttons that confirm the selection, if the UI has one
    #[serde(default)]
    pub apply: Vec<String>,
    /// Templates matching an indicator that the filter is active
    #[serde(default)]
    pub active: Vec<String>,
}

impl FilterControls {
    /// Option selectors for a value, in order.
    pub fn option_candidates(&self, value: &FilterValue) -> Vec<String> {
        self.options.iter().map(|t| value.render(t)).collect()
    }

    /// Active-indicator selectors for a value, in order.
    pub fn active_candidates(&self, value: &FilterValue) -> Vec<String> {
        self.active.iter().map(|t| value.render(t)).collect()
    }
}

/// Ordered selector candidates for every [`FieldKind`], plus filter controls.
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    fields: HashMap<FieldKind, Vec<String>>,
    filters: HashMap<FilterKind, FilterControls>,
}

const FILTER_KINDS: [FilterKind; 4] = [
    FilterKind::DatePosted,
    FilterKind::WorkArrangement,
    FilterKind::ExperienceLevel,
    FilterKind::JobType,
];

fn builtin_candidates(kind: FieldKind) -> &'static [&'static str] {
    match kind {
        FieldKind::ResultCard => &[
            "li.jobs-search-results__list-item",
            ".job-card-container",
            "li.scaffold-layout__list-item",
            "li[data-occludable-job-id]",
            ".base-card",
        ],
        FieldKind::CardTitle => &[
            ".job-card-list__title",
            ".job-card-container__link strong",
            ".artdeco-entity-lockup__title",
            ".base-search-card__title",
            "h3",
        ],
        FieldKind::CardCompany => &[
            ".job-card-container__primary-description",
            ".artdeco-entity-lockup__subtitle",
            ".base-search-card__subtitle",
            "h4",
        ],
        FieldKind::CardLocation => &[
            ".job-card-container__metadata-item",
            ".artdeco-entity-lockup__caption",
            ".job-search-card__location",
        ],
        FieldKind::CardLink => &[
            "a.job-card-container__link",
            "a.job-card-list__title",
            "a.base-card__full-link",
            "a[href*='/jobs/view/']",
        ],
        FieldKind::PanelContainer => &[
            ".jobs-search__job-details--container",
            ".jobs-details",
            ".job-view-layout",
            ".scaffold-layout__detail",
        ],
        FieldKind::Title => &[
            ".job-details-jobs-unified-top-card__job-title h1",
            ".jobs-unified-top-card__job-title",
            ".jobs-details-top-card__job-title",
            "h1.t-24",
            ".top-card-layout__title",
            "h2.topcard__title",
            ".jobs-details h1",
            "[data-test-job-title]",
        ],
        FieldKind::Company => &[
            ".job-details-jobs-unified-top-card__company-name a",
            ".job-details-jobs-unified-top-card__company-name",
            ".jobs-unified-top-card__company-name",
            ".jobs-details-top-card__company-url",
            ".topcard__org-name-link",
        ],
        FieldKind::Location => &[
            ".job-details-jobs-unified-top-card__primary-description-container .tvm__text:first-child",
            ".jobs-unified-top-card__bullet",
            ".jobs-details-top-card__bullet",
            ".topcard__flavor--bullet",
        ],
        FieldKind::Description => &[
            "#job-details",
            ".jobs-description__content",
            ".jobs-description-content__text",
            ".jobs-box__html-content",
            ".description__text",
        ],
        FieldKind::Insights => &[
            ".job-details-preferences-and-skills",
            ".job-details-jobs-unified-top-card__job-insight",
            ".jobs-unified-top-card__job-insight",
            ".description__job-criteria-list",
        ],
        FieldKind::PostedDate => &[
            ".job-details-jobs-unified-top-card__primary-description-container time",
            ".jobs-unified-top-card__posted-date",
            ".posted-time-ago__text",
            "time",
        ],
        FieldKind::ApplyLink => &[
            "a.jobs-apply-button",
            ".jobs-apply-button--top-card a",
            "a[data-tracking-control-name='public_jobs_apply-link-offsite']",
            "a[href*='externalApply']",
        ],
        FieldKind::QuickApply => &[
            "button.jobs-apply-button[aria-label*='Easy Apply']",
            ".jobs-apply-button--top-card button[aria-label*='Easy Apply']",
            "[data-job-apply-type='easy-apply']",
        ],
        FieldKind::ResultCount => &[
            ".jobs-search-results-list__subtitle",
            ".jobs-search-results-list__text",
            ".results-context-header__job-count",
        ],
        FieldKind::NextPage => &[
            "button[aria-label='View next page']",
            "button.artdeco-pagination__button--next",
            "button.jobs-search-pagination__button--next",
        ],
    }
}

fn builtin_controls(kind: FilterKind) -> FilterControls {
    let owned = |items: &[&str]| items.iter().map(ToString::to_string).collect::<Vec<_>>();
    let active = owned(&[
        "[data-active-filter='{code}']",
        "button.artdeco-pill--selected[aria-label*='{label}']",
    ]);
    let apply = owned(&[
        "button[aria-label*='Apply current filter']",
        ".reusables-filters--footer button.artdeco-button--primary",
    ]);
    match kind {
        FilterKind::DatePosted => FilterControls {
            triggers: owned(&[
                "button[aria-label*='Date posted filter']",
                "#searchFilter_timePostedRange",
            ]),
            options: owned(&[
                "input[name='date-posted-filter-value'][value='{code}']",
                "label[for='timePostedRange-{code}']",
            ]),
            apply,
            active,
        },
        FilterKind::WorkArrangement => FilterControls {
            triggers: owned(&[
                "button[aria-label*='Remote filter']",
                "#searchFilter_workplaceType",
            ]),
            options: owned(&[
                "input[name='remote-filter-value'][value='{code}']",
                "label[for='workplaceType-{code}']",
            ]),
            apply,
            active,
        },
        FilterKind::ExperienceLevel => FilterControls {
            triggers: owned(&[
                "button[aria-label*='Experience level filter']",
                "#searchFilter_experience",
            ]),
            options: owned(&[
                "input[name='experience-level-filter-value'][value='{code}']",
                "label[for='experience-{code}']",
            ]),
            apply,
            active,
        },
        FilterKind::JobType => FilterControls {
            triggers: owned(&[
                "button[aria-label*='Job type filter']",
                "#searchFilter_jobType",
            ]),
            options: owned(&[
                "input[name='job-type-filter-value'][value='{code}']",
                "label[for='jobType-{code}']",
            ]),
            apply,
            active,
        },
    }
}

/// Representative value used to check that templates render to valid CSS.
fn sample_value(kind: FilterKind) -> FilterValue {
    match kind {
        FilterKind::DatePosted => FilterValue::DatePosted(7),
        FilterKind::WorkArrangement => FilterValue::WorkArrangement(WorkArrangement::Remote),
        FilterKind::ExperienceLevel => FilterValue::ExperienceLevel(ExperienceLevel::MidSenior),
        FilterKind::JobType => FilterValue::JobType(JobType::FullTime),
    }
}

fn filter_kind_from_key(key: &str) -> Option<FilterKind> {
    FILTER_KINDS.into_iter().find(|k| k.to_string() == key)
}

/// Shape of a catalog override file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Overrides {
    #[serde(default)]
    fields: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    filters: BTreeMap<String, FilterControls>,
}

impl SelectorCatalog {
    /// The built-in catalog.
    ///
    /// # Panics
    /// Only if the built-in table itself is malformed, which the tests rule out.
    pub fn builtin() -> Self {
        let fields = FieldKind::ALL
            .into_iter()
            .map(|kind| {
                let candidates = builtin_candidates(kind)
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                (kind, candidates)
            })
            .collect();
        let filters = FILTER_KINDS
            .into_iter()
            .map(|kind| (kind, builtin_controls(kind)))
            .collect();

        Self::from_parts(fields, filters).expect("built-in selector catalog is valid")
    }

    /// Build from explicit tables, validating every entry.
    pub fn from_parts(
        fields: HashMap<FieldKind, Vec<String>>,
        filters: HashMap<FilterKind, FilterControls>,
    ) -> Result<Self> {
        let catalog = Self { fields, filters };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Replace candidates with those in a TOML document.
    ///
    /// ```toml
    /// [fields]
    /// title = ["h1.job-title", "h2.job-title"]
    ///
    /// [filters.date_posted]
    /// options = ["input[value='{code}']"]
    /// active = ["[data-active-filter='{code}']"]
    /// ```
    ///
    /// Keys not present keep their built-in candidates. Unknown keys and
    /// unparsable selectors are rejected.
    pub fn with_overrides_toml(mut self, source: &str) -> Result<Self> {
        let overrides: Overrides = toml::from_str(source)
            .map_err(|e| ScrapeError::InvalidCatalog(format!("override file: {e}")))?;

        for (key, candidates) in overrides.fields {
            let kind = FieldKind::ALL
                .into_iter()
                .find(|k| k.key() == key)
                .ok_or_else(|| ScrapeError::InvalidCatalog(format!("unknown field `{key}`")))?;
            tracing::debug!(field = %kind, count = candidates.len(), "overriding selector candidates");
            self.fields.insert(kind, candidates);
        }

        for (key, controls) in overrides.filters {
            let kind = filter_kind_from_key(&key)
                .ok_or_else(|| ScrapeError::InvalidCatalog(format!("unknown filter `{key}`")))?;
            self.filters.insert(kind, controls);
        }

        self.validate()?;
        Ok(self)
    }

    /// Load overrides from a file.
    pub fn with_overrides_file(self, path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::InvalidCatalog(format!("cannot read {}: {e}", path.display()))
        })?;
        self.with_overrides_toml(&source)
    }

    /// Ordered candidates for a field. Never empty.
    pub fn candidates(&self, kind: FieldKind) -> &[String] {
        self.fields.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// First candidate for a field.
    pub fn primary(&self, kind: FieldKind) -> &str {
        self.candidates(kind).first().map_or("", String::as_str)
    }

    /// Controls for a filter kind.
    pub fn filter_controls(&self, kind: FilterKind) -> &FilterControls {
        // validate() guarantees every kind is present
        &self.filters[&kind]
    }

    fn validate(&self) -> Result<()> {
        for kind in FieldKind::ALL {
            let candidates = self
                .fields
                .get(&kind)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    ScrapeError::InvalidCatalog(format!("no selector candidates for `{kind}`"))
                })?;
            for candidate in candidates {
                check_css(&kind.to_string(), candidate)?;
            }
        }

        for kind in FILTER_KINDS {
            let controls = self.filters.get(&kind).ok_or_else(|| {
                ScrapeError::InvalidCatalog(format!("no controls for filter `{kind}`"))
            })?;
            if controls.options.is_empty() {
                return Err(ScrapeError::InvalidCatalog(format!(
                    "filter `{kind}` has no option templates"
                )));
            }
            let sample = sample_value(kind);
            for selector in controls.triggers.iter().chain(&controls.apply) {
                check_css(&kind.to_string(), selector)?;
            }
            for template in controls.options.iter().chain(&controls.active) {
                check_css(&kind.to_string(), &sample.render(template))?;
            }
        }
        Ok(())
    }
}

impl Default for SelectorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn check_css(owner: &str, selector: &str) -> Result<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ScrapeError::InvalidCatalog(format!("`{owner}` selector `{selector}`: {e}")))
}
