use crate::sources::{presets, FeedSource, HtmlBoardSource};
use crate::traits::SourceAdapter;
use crate::types::{ConfigError, FetchConfig, Query};
use crate::utils::links;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Everything a pipeline needs, supplied by the calling application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl PipelineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a meaningful run.
    /// Per-source checks (selectors, templates) happen when adapters are built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name().to_lowercase()) {
                return Err(ConfigError::DuplicateSource(source.name().to_string()));
            }
            if source.queries().is_empty() {
                return Err(ConfigError::NoQueries(source.name().to_string()));
            }
            if source.max_items_per_query() == 0 {
                return Err(ConfigError::ZeroLimit("max_items_per_query"));
            }
        }

        self.keywords.validate()?;

        let fetch = &self.fetch;
        if fetch.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit("fetch.max_attempts"));
        }
        if fetch.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroLimit("fetch.request_timeout_secs"));
        }
        if fetch.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(ConfigError::EmptyKeywordList("fetch.user_agents"));
        }
        let (min, max) = fetch.politeness_delay_ms;
        if min > max {
            return Err(ConfigError::InvalidRange(format!(
                "fetch.politeness_delay_ms [{}, {}] has min above max",
                min, max
            )));
        }
        if !(0.0..=1.0).contains(&fetch.jitter) {
            return Err(ConfigError::InvalidRange(format!(
                "fetch.jitter {} is outside 0.0..=1.0",
                fetch.jitter
            )));
        }
        if fetch.rate_limit_multiplier < 1.0 {
            return Err(ConfigError::InvalidRange(format!(
                "fetch.rate_limit_multiplier {} is below 1.0",
                fetch.rate_limit_multiplier
            )));
        }
        if fetch.backoff_base_ms > fetch.backoff_max_ms {
            return Err(ConfigError::InvalidRange(format!(
                "fetch.backoff_base_ms {} exceeds fetch.backoff_max_ms {}",
                fetch.backoff_base_ms, fetch.backoff_max_ms
            )));
        }

        if self.run.max_results == 0 {
            return Err(ConfigError::ZeroLimit("run.max_results"));
        }
        if self.run.max_concurrent_sources == 0 {
            return Err(ConfigError::ZeroLimit("run.max_concurrent_sources"));
        }
        if self.run.source_timeout_ms == 0 {
            return Err(ConfigError::ZeroLimit("run.source_timeout_ms"));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    /// The camera-department search: Indeed across five countries plus LinkedIn.
    fn default() -> Self {
        Self {
            sources: vec![
                presets::indeed(
                    &["cinematographer", "director photography"],
                    &["United Kingdom", "Germany", "France", "United States", "Canada"],
                ),
                presets::linkedin(&["cinematographer"]),
            ],
            keywords: KeywordConfig::default(),
            fetch: FetchConfig::default(),
            run: RunConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Html(HtmlSourceConfig),
    Feed(FeedSourceConfig),
}

impl SourceConfig {
    pub fn name(&self) -> &str {
        match self {
            SourceConfig::Html(c) => &c.name,
            SourceConfig::Feed(c) => &c.name,
        }
    }

    pub fn queries(&self) -> &[QueryTemplate] {
        match self {
            SourceConfig::Html(c) => &c.queries,
            SourceConfig::Feed(c) => &c.queries,
        }
    }

    pub fn max_items_per_query(&self) -> usize {
        match self {
            SourceConfig::Html(c) => c.max_items_per_query,
            SourceConfig::Feed(c) => c.max_items_per_query,
        }
    }

    pub fn build(&self) -> Result<Box<dyn SourceAdapter>, ConfigError> {
        Ok(match self {
            SourceConfig::Html(c) => Box::new(HtmlBoardSource::from_config(c)?),
            SourceConfig::Feed(c) => Box::new(FeedSource::from_config(c)?),
        })
    }
}

fn default_max_items() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlSourceConfig {
    pub name: String,
    pub base_url: String,
    pub queries: Vec<QueryTemplate>,
    #[serde(default = "default_max_items")]
    pub max_items_per_query: usize,
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub default_company: Option<String>,
    #[serde(default)]
    pub default_salary: Option<String>,
}

/// Ordered CSS selector fallbacks per field. `item` and `title` are required;
/// the rest may be left empty when a board never shows the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub item: Vec<String>,
    pub title: Vec<String>,
    #[serde(default)]
    pub company: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub link: Vec<String>,
    #[serde(default)]
    pub salary: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    pub name: String,
    /// Used to resolve relative entry links; defaults to each feed's own URL.
    #[serde(default)]
    pub base_url: Option<String>,
    pub queries: Vec<QueryTemplate>,
    #[serde(default = "default_max_items")]
    pub max_items_per_query: usize,
    #[serde(default)]
    pub default_company: Option<String>,
    #[serde(default)]
    pub default_location: Option<String>,
}

/// How a source turns configuration into concrete request URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryTemplate {
    /// `template` holds `{keyword}` and optionally `{location}` placeholders,
    /// expanded over every keyword × location pair.
    Search {
        template: String,
        keywords: Vec<String>,
        #[serde(default)]
        locations: Vec<String>,
    },
    /// A single fixed URL, e.g. a syndication feed.
    Url {
        url: String,
        #[serde(default)]
        location: Option<String>,
    },
}

impl QueryTemplate {
    pub fn expand(&self, source: &str) -> Result<Vec<Query>, ConfigError> {
        let invalid = |template: &str, reason: &str| ConfigError::InvalidTemplate {
            name: source.to_string(),
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let queries = match self {
            QueryTemplate::Search {
                template,
                keywords,
                locations,
            } => {
                if !template.contains("{keyword}") {
                    return Err(invalid(template, "missing {keyword} placeholder"));
                }
                if keywords.is_empty() {
                    return Err(invalid(template, "no keywords"));
                }
                if template.contains("{location}") && locations.is_empty() {
                    return Err(invalid(template, "has {location} but no locations"));
                }

                let mut out = Vec::new();
                for keyword in keywords {
                    let with_keyword = template.replace("{keyword}", &links::encode_query_value(keyword));
                    if locations.is_empty() {
                        out.push(Query {
                            url: with_keyword,
                            location: None,
                        });
                        continue;
                    }
                    for location in locations {
                        out.push(Query {
                            url: with_keyword.replace("{location}", &links::encode_query_value(location)),
                            location: Some(location.trim().to_string()),
                        });
                    }
                }
                out
            }
            QueryTemplate::Url { url, location } => vec![Query {
                url: url.clone(),
                location: location.clone(),
            }],
        };

        for query in &queries {
            if !links::is_http_url(&query.url) {
                return Err(invalid(&query.url, "not an http(s) url"));
            }
        }
        Ok(queries)
    }
}

/// Expand every template of a source, in configuration order.
pub fn expand_queries(source: &str, templates: &[QueryTemplate]) -> Result<Vec<Query>, ConfigError> {
    let mut queries = Vec::new();
    for template in templates {
        queries.extend(template.expand(source)?);
    }
    Ok(queries)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub relevance: Vec<String>,
    pub priority: Vec<String>,
    pub target_locations: Vec<String>,
}

impl KeywordConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let blank = |list: &[String]| list.iter().all(|k| k.trim().is_empty());
        if blank(&self.relevance) {
            return Err(ConfigError::EmptyKeywordList("keywords.relevance"));
        }
        if blank(&self.target_locations) {
            return Err(ConfigError::EmptyKeywordList("keywords.target_locations"));
        }
        Ok(())
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            relevance: owned(&[
                "cinematographer",
                "director of photography",
                "dop",
                "camera operator",
                "camera department",
                "gaffer",
                "lighting",
                "camera assistant",
            ]),
            priority: owned(&[
                "tv series",
                "television",
                "feature film",
                "netflix",
                "hbo",
                "amazon",
                "disney",
                "drama series",
                "narrative",
                "cinema",
                "movie",
                "streaming",
            ]),
            target_locations: owned(&[
                // Europe
                "uk", "united kingdom", "london", "england", "scotland", "wales",
                "france", "paris", "germany", "berlin", "munich", "spain", "madrid",
                "italy", "rome", "milan", "netherlands", "amsterdam", "belgium",
                "brussels", "sweden", "norway", "denmark",
                // North America
                "usa", "united states", "new york", "los angeles", "california",
                "atlanta", "chicago", "texas", "florida", "canada", "toronto",
                "vancouver", "montreal",
            ]),
        }
    }
}

/// Which fields decide that two listings are the same posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScheme {
    /// Title, company and location (the listing id).
    #[default]
    TitleCompanyLocation,
    /// Title and company only, matching the older scrapers. Postings for the
    /// same role in two cities collapse into one.
    TitleCompany,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub max_results: usize,
    /// 1 runs sources one after another.
    pub max_concurrent_sources: usize,
    pub source_timeout_ms: u64,
    pub identity: IdentityScheme,
}

impl RunConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_results: 15,
            max_concurrent_sources: 1,
            source_timeout_ms: 300_000,
            identity: IdentityScheme::default(),
        }
    }
}
