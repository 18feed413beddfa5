use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::dedup::listing_id;

pub const DEFAULT_COMPANY: &str = "Not Listed";
pub const DEFAULT_LOCATION: &str = "Unspecified";
pub const DEFAULT_SALARY: &str = "Not listed";

/// A validated, classified posting. Built once from a [`RawCandidate`] and
/// never mutated afterwards; later stages only filter or drop listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobListing {
    id: String,
    title: String,
    company: String,
    location: String,
    salary: String,
    source: String,
    url: String,
    description: String,
    priority: bool,
    scraped_date: NaiveDate,
}

impl JobListing {
    /// Promote a candidate that passed relevance classification, filling in
    /// the defaults for fields the source did not expose.
    pub fn promote(candidate: RawCandidate, priority: bool, scraped_date: NaiveDate) -> Self {
        let company = non_empty_or(candidate.company, DEFAULT_COMPANY);
        let location = non_empty_or(candidate.location, DEFAULT_LOCATION);
        let salary = non_empty_or(candidate.salary, DEFAULT_SALARY);
        let id = listing_id(&candidate.title, &company, &location);

        Self {
            id,
            title: candidate.title,
            company,
            location,
            salary,
            source: candidate.source,
            url: candidate.url.unwrap_or_default(),
            description: candidate.description.unwrap_or_default(),
            priority,
            scraped_date,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn salary(&self) -> &str {
        &self.salary
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn priority(&self) -> bool {
        self.priority
    }

    pub fn scraped_date(&self) -> NaiveDate {
        self.scraped_date
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// A record pulled out of one payload item, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub source: String,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl RawCandidate {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            company: None,
            location: None,
            salary: None,
            source: source.into(),
            url: None,
            description: None,
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_salary(mut self, salary: impl Into<String>) -> Self {
        self.salary = Some(salary.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One concrete request derived from a source's query templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub url: String,
    /// Location searched for, when the template had one.
    pub location: Option<String>,
}

/// A fetched document plus the query context that produced it.
#[derive(Debug, Clone)]
pub struct Payload {
    pub url: String,
    pub body: String,
    pub query_location: Option<String>,
}

impl Payload {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            query_location: None,
        }
    }

    pub fn with_query_location(mut self, location: Option<String>) -> Self {
        self.query_location = location;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agents: Vec<String>,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Randomization factor applied to every backoff interval (0.0..=1.0).
    pub jitter: f64,
    pub rate_limit_multiplier: f64,
    /// Randomized spacing between two requests to the same host.
    pub politeness_delay_ms: (u64, u64),
    pub max_redirects: usize,
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            request_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            jitter: 0.5,
            rate_limit_multiplier: 3.0,
            politeness_delay_ms: (2_000, 6_000),
            max_redirects: 5,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
];

/// Summary of a single pipeline run, for logging by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scraped_date: NaiveDate,
    pub sources: Vec<SourceReport>,
    /// Listings that reached the merge stage (relevant, all sources).
    pub merged: usize,
    pub returned: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceReport {
    pub source: String,
    pub queries: usize,
    pub payloads: usize,
    pub failed_queries: usize,
    pub candidates: usize,
    pub relevant: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("response body too large: {bytes} bytes")]
    BodyTooLarge { bytes: usize },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::ConnectionFailed(_) | FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus(code) => *code == 408 || *code >= 500,
            FetchError::BodyTooLarge { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("item has no title")]
    MissingTitle,

    #[error("payload is not a syndication feed: {0}")]
    InvalidFeed(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("{name}: all {queries} queries failed, last error: {last}")]
    AllQueriesFailed {
        name: String,
        queries: usize,
        last: FetchError,
    },

    #[error("{name}: gave up after {after:?}")]
    TimedOut { name: String, after: Duration },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,

    #[error("source '{0}' has no query templates")]
    NoQueries(String),

    #[error("source '{0}' is configured more than once")]
    DuplicateSource(String),

    #[error("keyword list '{0}' is empty")]
    EmptyKeywordList(&'static str),

    #[error("source '{name}': selector chain for {field} is empty")]
    EmptySelectorChain { name: String, field: &'static str },

    #[error("source '{name}': invalid selector '{selector}': {reason}")]
    InvalidSelector {
        name: String,
        selector: String,
        reason: String,
    },

    #[error("source '{name}': invalid base url '{url}'")]
    InvalidBaseUrl { name: String, url: String },

    #[error("source '{name}': invalid query template '{template}': {reason}")]
    InvalidTemplate {
        name: String,
        template: String,
        reason: String,
    },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
