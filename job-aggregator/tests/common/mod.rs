// Shared fixtures for the integration tests: a scripted HTTP transport,
// canned job board pages and feeds, and fast pipeline configurations.
#![allow(dead_code)]

use async_trait::async_trait;
use job_aggregator::config::{FeedSourceConfig, HtmlSourceConfig, SelectorConfig};
use job_aggregator::{
    FetchConfig, FetchError, HttpRequest, HttpResponse, HttpTransport, KeywordConfig, PipelineConfig, QueryTemplate,
    RunConfig, SourceConfig,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const BOARD_BASE: &str = "https://board.example";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// What the scripted transport does for one request.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, String),
    RateLimited(Option<Duration>),
    Fail(FetchError),
    /// Never answers; only a timeout gets the caller out.
    Hang,
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Status(200, body.into())
    }
}

/// Replays per-URL scripts. The last reply of a script repeats forever;
/// unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    sent_at: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
        self
    }

    pub fn ok(self, url: &str, body: impl Into<String>) -> Self {
        self.script(url, vec![Reply::ok(body)])
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.url == url).count()
    }

    /// When each request for `url` reached the transport, in order.
    pub fn request_times(&self, url: &str) -> Vec<Instant> {
        self.sent_at
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .map(|(_, at)| *at)
            .collect()
    }

    fn next_reply(&self, url: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::Status(404, String::new())),
            None => Reply::Status(404, String::new()),
        }
    }
}

async fn play(reply: Reply) -> Result<HttpResponse, FetchError> {
    let mut reply = reply;
    loop {
        match reply {
            Reply::Status(status, body) => {
                return Ok(HttpResponse {
                    status,
                    body,
                    retry_after: None,
                })
            }
            Reply::RateLimited(retry_after) => {
                return Ok(HttpResponse {
                    status: 429,
                    body: String::new(),
                    retry_after,
                })
            }
            Reply::Fail(error) => return Err(error),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                return Err(FetchError::Timeout);
            }
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.sent_at.lock().unwrap().push((request.url.clone(), Instant::now()));
        let reply = self.next_reply(&request.url);
        play(reply).await
    }
}

/// Fetch settings with no politeness spacing and millisecond backoff.
pub fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        request_timeout_secs: 1,
        max_attempts: 3,
        backoff_base_ms: 1,
        backoff_max_ms: 10,
        jitter: 0.0,
        politeness_delay_ms: (0, 0),
        ..FetchConfig::default()
    }
}

pub fn test_config(sources: Vec<SourceConfig>) -> PipelineConfig {
    PipelineConfig {
        sources,
        keywords: KeywordConfig::default(),
        fetch: fast_fetch_config(),
        run: RunConfig {
            max_results: 15,
            max_concurrent_sources: 1,
            source_timeout_ms: 60_000,
            ..RunConfig::default()
        },
    }
}

pub fn board_selectors() -> SelectorConfig {
    SelectorConfig {
        item: vec!["div.job-card".to_string()],
        title: vec!["h2.title".to_string()],
        company: vec!["span.company".to_string()],
        location: vec!["span.location".to_string()],
        link: vec!["a.apply".to_string()],
        salary: vec!["span.salary".to_string()],
        description: vec!["p.summary".to_string()],
    }
}

pub fn board_source(name: &str, urls: &[&str]) -> SourceConfig {
    SourceConfig::Html(HtmlSourceConfig {
        name: name.to_string(),
        base_url: BOARD_BASE.to_string(),
        queries: urls
            .iter()
            .map(|url| QueryTemplate::Url {
                url: url.to_string(),
                location: None,
            })
            .collect(),
        max_items_per_query: 50,
        selectors: board_selectors(),
        default_company: None,
        default_salary: None,
    })
}

pub fn feed_source(name: &str, url: &str) -> SourceConfig {
    SourceConfig::Feed(FeedSourceConfig {
        name: name.to_string(),
        base_url: None,
        queries: vec![QueryTemplate::Url {
            url: url.to_string(),
            location: None,
        }],
        max_items_per_query: 50,
        default_company: None,
        default_location: None,
    })
}

pub fn job_card(title: &str, company: &str, location: &str, href: &str) -> String {
    format!(
        r#"<div class="job-card">
  <h2 class="title">{}</h2>
  <span class="company">{}</span>
  <span class="location">{}</span>
  <a class="apply" href="{}">Apply</a>
</div>"#,
        title, company, location, href
    )
}

pub fn board_page(cards: &[String]) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Jobs</title></head><body><main>{}</main></body></html>",
        cards.join("\n")
    )
}

pub const CREW_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Crew Calls</title>
    <link>https://crew.example</link>
    <description>Camera department vacancies</description>
    <item>
      <title>Director of Photography - Feature Film</title>
      <link>https://crew.example/jobs/101</link>
      <author>Northlight Pictures</author>
      <category>London, UK</category>
      <description>&lt;p&gt;Shoot a &lt;b&gt;feature film&lt;/b&gt; in London.&lt;/p&gt;</description>
    </item>
    <item>
      <description>An entry with no title at all</description>
    </item>
    <item>
      <title>Gaffer</title>
      <link>https://crew.example/jobs/102</link>
      <category>Berlin, Germany</category>
    </item>
  </channel>
</rss>"#;
