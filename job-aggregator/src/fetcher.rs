use crate::traits::{HttpRequest, HttpResponse, HttpTransport};
use crate::types::{FetchConfig, FetchError, Payload, Result, DEFAULT_USER_AGENTS};
use crate::utils::links;
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, RETRY_AFTER, USER_AGENT};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.9",
    "en-GB,en-US;q=0.8,en;q=0.7",
    "en;q=0.8",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// [`HttpTransport`] backed by a pooled `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::ConnectionFailed(error.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, FetchError> {
        let response = self
            .client
            .get(&request.url)
            .header(USER_AGENT, &request.user_agent)
            .header(ACCEPT_LANGUAGE, &request.accept_language)
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        if let Some(length) = response.content_length() {
            if length as usize > self.max_body_bytes {
                return Err(FetchError::BodyTooLarge { bytes: length as usize });
            }
        }

        let body = response.text().await.map_err(classify)?;
        if body.len() > self.max_body_bytes {
            return Err(FetchError::BodyTooLarge { bytes: body.len() });
        }

        Ok(HttpResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Retrying, host-polite GET client shared by every source in a run.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    config: FetchConfig,
    /// Start time of the most recent request reserved per host.
    rate_limiter: Arc<Mutex<HashMap<String, Instant>>>,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: FetchConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            config,
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch `url`, retrying retryable failures with exponential backoff.
    /// Returns the last error once the attempt budget is spent.
    pub async fn fetch(&self, url: &str) -> std::result::Result<Payload, FetchError> {
        let max_attempts = self.config.max_attempts.max(1);
        let request_timeout = Duration::from_secs(self.config.request_timeout_secs);
        let mut backoff = self.backoff_policy();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.apply_rate_limit(url).await;

            let request = self.build_request(url);
            debug!("Fetching {} (attempt {}/{})", url, attempt, max_attempts);

            let outcome = match tokio::time::timeout(request_timeout, self.transport.get(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout),
            };

            let error = match outcome {
                Ok(response) if (200..300).contains(&response.status) => {
                    debug!("Fetched {} ({} bytes)", url, response.body.len());
                    return Ok(Payload::new(url, response.body));
                }
                Ok(response) if response.status == 429 => FetchError::RateLimited {
                    retry_after: response.retry_after,
                },
                Ok(response) => FetchError::HttpStatus(response.status),
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                warn!("Giving up on {} after {} attempt(s): {}", url, attempt, error);
                return Err(error);
            }

            let base = backoff
                .next_backoff()
                .unwrap_or_else(|| Duration::from_millis(self.config.backoff_max_ms));
            let delay = scaled_delay(base, &error, attempt, &self.config);
            warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt, url, error, delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff_policy(&self) -> ExponentialBackoff {
        let base = Duration::from_millis(self.config.backoff_base_ms);
        ExponentialBackoff {
            current_interval: base,
            initial_interval: base,
            randomization_factor: self.config.jitter,
            multiplier: 2.0,
            max_interval: Duration::from_millis(self.config.backoff_max_ms),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    fn build_request(&self, url: &str) -> HttpRequest {
        let mut rng = rand::thread_rng();
        let user_agent = self
            .config
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string());
        let accept_language = ACCEPT_LANGUAGES
            .choose(&mut rng)
            .copied()
            .unwrap_or(ACCEPT_LANGUAGES[0])
            .to_string();

        HttpRequest {
            url: url.to_string(),
            user_agent,
            accept_language,
        }
    }

    fn politeness_delay(&self) -> Duration {
        let (min, max) = self.config.politeness_delay_ms;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Reserve the next request slot for the url's host and wait for it.
    /// Slots are reserved under the lock, so concurrent sources hitting the
    /// same host still end up spaced apart.
    async fn apply_rate_limit(&self, url: &str) {
        let host = links::host(url).unwrap_or_default();
        let spacing = self.politeness_delay();

        let wait = {
            let mut slots = self.rate_limiter.lock().await;
            let now = Instant::now();
            let slot = match slots.get(&host) {
                Some(&last) => (last + spacing).max(now),
                None => now,
            };
            slots.insert(host.clone(), slot);
            slot.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            debug!("Politeness delay for {}: waiting {:?}", host, wait);
            tokio::time::sleep(wait).await;
        }
    }
}

/// Delay before the next attempt. Rate-limit responses wait
/// `rate_limit_multiplier * attempt` times longer than a generic failure, or
/// the server's `Retry-After` if that is longer (capped).
pub fn scaled_delay(base: Duration, error: &FetchError, attempt: u32, config: &FetchConfig) -> Duration {
    match error {
        FetchError::RateLimited { retry_after } => {
            let factor = config.rate_limit_multiplier.max(1.0) * f64::from(attempt.max(1));
            let scaled = base.mul_f64(factor);
            let cap = Duration::from_millis(config.backoff_max_ms).mul_f64(config.rate_limit_multiplier.max(1.0));
            match retry_after {
                Some(server) if *server > scaled => (*server).min(cap.max(scaled)),
                _ => scaled,
            }
        }
        _ => base,
    }
}
