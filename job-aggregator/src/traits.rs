use crate::types::{FetchError, JobListing, Payload, Query, RawCandidate, Result};
use async_trait::async_trait;
use std::time::Duration;

/// A job board or feed that turns fetched payloads into candidates.
///
/// Implementations are pure with respect to the network: the pipeline
/// fetches every [`Query`] and hands each payload to [`SourceAdapter::extract`].
pub trait SourceAdapter: Send + Sync {
    /// Name recorded on every candidate from this source
    fn name(&self) -> &str;

    /// Concrete requests to issue, in order
    fn queries(&self) -> &[Query];

    /// Best-effort extraction. A malformed item is skipped, never the batch.
    fn extract(&self, payload: &Payload) -> Vec<RawCandidate>;
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub user_agent: String,
    pub accept_language: String,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub retry_after: Option<Duration>,
}

/// Single GET round trip. Retries, pacing and status interpretation live in
/// the [`Fetcher`](crate::Fetcher); a transport only reports what happened.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, FetchError>;
}

/// Downstream collaborator receiving the final ranked listings
/// (notifier, persister, ...).
#[async_trait]
pub trait ListingSink: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(&self, listings: &[JobListing]) -> Result<()>;
}
