use crate::config::{expand_queries, FeedSourceConfig};
use crate::parser::{FeedParser, ParsedEntry};
use crate::traits::SourceAdapter;
use crate::types::{ConfigError, ExtractionError, Payload, Query, RawCandidate};
use crate::utils::{links, text};
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

const MAX_DESCRIPTION_CHARS: usize = 500;

/// A job board that publishes postings as an RSS or Atom feed.
pub struct FeedSource {
    name: String,
    base_url: Option<Url>,
    queries: Vec<Query>,
    max_items: usize,
    default_company: Option<String>,
    default_location: Option<String>,
}

impl FeedSource {
    pub fn from_config(config: &FeedSourceConfig) -> Result<Self, ConfigError> {
        let name = config.name.trim().to_string();
        let base_url = match &config.base_url {
            Some(raw) => Some(Url::parse(raw).map_err(|_| ConfigError::InvalidBaseUrl {
                name: name.clone(),
                url: raw.clone(),
            })?),
            None => None,
        };
        let queries = expand_queries(&name, &config.queries)?;

        info!("Configured feed source {} with {} feeds", name, queries.len());
        Ok(Self {
            name,
            base_url,
            queries,
            max_items: config.max_items_per_query,
            default_company: config.default_company.clone(),
            default_location: config.default_location.clone(),
        })
    }

    fn extract_entry(&self, entry: ParsedEntry, payload: &Payload) -> Result<RawCandidate, ExtractionError> {
        let title = entry
            .title
            .as_deref()
            .and_then(text::non_empty_decoded)
            .ok_or(ExtractionError::MissingTitle)?;

        let base = self
            .base_url
            .clone()
            .or_else(|| Url::parse(&payload.url).ok());

        let mut candidate = RawCandidate::new(self.name.clone(), title);
        candidate.company = entry
            .author
            .as_deref()
            .and_then(text::non_empty_decoded)
            .or_else(|| self.default_company.clone());
        candidate.location = entry
            .categories
            .iter()
            .find_map(|c| text::non_empty_decoded(c))
            .or_else(|| payload.query_location.clone())
            .or_else(|| self.default_location.clone());
        candidate.url = match (entry.link.as_deref(), base.as_ref()) {
            (Some(href), Some(base)) => links::resolve(base, href),
            (Some(href), None) if links::is_http_url(href) => Some(href.to_string()),
            _ => None,
        };
        candidate.description = entry
            .summary
            .as_deref()
            .map(strip_markup)
            .and_then(|s| text::non_empty(&s))
            .map(|s| text::truncate(&s, MAX_DESCRIPTION_CHARS));

        Ok(candidate)
    }
}

fn strip_markup(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

impl SourceAdapter for FeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn queries(&self) -> &[Query] {
        &self.queries
    }

    fn extract(&self, payload: &Payload) -> Vec<RawCandidate> {
        if !FeedParser::is_valid_feed_content(&payload.body) {
            warn!("{}: {} did not return a feed", self.name, payload.url);
            return Vec::new();
        }

        let feed = match FeedParser::parse_feed(&payload.body) {
            Ok(feed) => feed,
            Err(e) => {
                warn!("{}: failed to parse {}: {}", self.name, payload.url, e);
                return Vec::new();
            }
        };

        debug!(
            "{}: feed '{}' has {} entries",
            self.name,
            feed.title.as_deref().unwrap_or("untitled"),
            feed.entries.len()
        );

        let mut candidates = Vec::new();
        for (index, entry) in feed.entries.into_iter().take(self.max_items).enumerate() {
            match self.extract_entry(entry, payload) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => debug!("{}: skipping entry {} on {}: {}", self.name, index, payload.url, e),
            }
        }
        candidates
    }
}
