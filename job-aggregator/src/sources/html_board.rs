use crate::config::{expand_queries, HtmlSourceConfig};
use crate::selectors::{InvalidSelector, SelectorChain};
use crate::traits::SourceAdapter;
use crate::types::{ConfigError, ExtractionError, Payload, Query, RawCandidate};
use crate::utils::{links, text};
use scraper::{ElementRef, Html};
use tracing::{debug, info};
use url::Url;

const MAX_DESCRIPTION_CHARS: usize = 500;

/// A job board scraped from server-rendered HTML search pages.
pub struct HtmlBoardSource {
    name: String,
    base_url: Url,
    queries: Vec<Query>,
    max_items: usize,
    items: SelectorChain,
    title: SelectorChain,
    company: SelectorChain,
    location: SelectorChain,
    link: SelectorChain,
    salary: SelectorChain,
    description: SelectorChain,
    default_company: Option<String>,
    default_salary: Option<String>,
}

impl HtmlBoardSource {
    pub fn from_config(config: &HtmlSourceConfig) -> Result<Self, ConfigError> {
        let name = config.name.trim().to_string();
        let base_url = Url::parse(&config.base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            name: name.clone(),
            url: config.base_url.clone(),
        })?;

        let chain = |field: &'static str, patterns: &[String], required: bool| -> Result<SelectorChain, ConfigError> {
            let chain = SelectorChain::parse(patterns).map_err(|InvalidSelector { selector, reason }| {
                ConfigError::InvalidSelector {
                    name: name.clone(),
                    selector,
                    reason,
                }
            })?;
            if required && chain.is_empty() {
                return Err(ConfigError::EmptySelectorChain {
                    name: name.clone(),
                    field,
                });
            }
            Ok(chain)
        };

        let selectors = &config.selectors;
        let source = Self {
            items: chain("item", &selectors.item, true)?,
            title: chain("title", &selectors.title, true)?,
            company: chain("company", &selectors.company, false)?,
            location: chain("location", &selectors.location, false)?,
            link: chain("link", &selectors.link, false)?,
            salary: chain("salary", &selectors.salary, false)?,
            description: chain("description", &selectors.description, false)?,
            queries: expand_queries(&name, &config.queries)?,
            max_items: config.max_items_per_query,
            default_company: config.default_company.clone(),
            default_salary: config.default_salary.clone(),
            base_url,
            name,
        };

        info!("Configured HTML source {} with {} queries", source.name, source.queries.len());
        Ok(source)
    }

    fn extract_item(&self, item: ElementRef<'_>, payload: &Payload) -> Result<RawCandidate, ExtractionError> {
        let title = self.title.first_text(item).ok_or(ExtractionError::MissingTitle)?;

        let mut candidate = RawCandidate::new(self.name.clone(), title);
        candidate.company = self
            .company
            .first_text(item)
            .or_else(|| self.default_company.clone());
        // Boards often omit the location on cards when it matches the search.
        candidate.location = self
            .location
            .first_text(item)
            .or_else(|| payload.query_location.clone());
        candidate.salary = self
            .salary
            .first_text(item)
            .or_else(|| self.default_salary.clone());
        candidate.url = self
            .link
            .first_attr(item, "href")
            .and_then(|href| links::resolve(&self.base_url, &href));
        candidate.description = self
            .description
            .first_text(item)
            .map(|d| text::truncate(&d, MAX_DESCRIPTION_CHARS));

        Ok(candidate)
    }
}

impl SourceAdapter for HtmlBoardSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn queries(&self) -> &[Query] {
        &self.queries
    }

    fn extract(&self, payload: &Payload) -> Vec<RawCandidate> {
        let document = Html::parse_document(&payload.body);
        let items = self.items.select_items(&document);

        if items.is_empty() {
            debug!("{}: no items matched on {}", self.name, payload.url);
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (index, item) in items.into_iter().take(self.max_items).enumerate() {
            match self.extract_item(item, payload) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => debug!("{}: skipping item {} on {}: {}", self.name, index, payload.url, e),
            }
        }

        debug!("{}: extracted {} candidates from {}", self.name, candidates.len(), payload.url);
        candidates
    }
}
