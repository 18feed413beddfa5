use crate::aggregator::ListingAggregator;
use crate::classifier::Classifier;
use crate::config::{PipelineConfig, SourceConfig};
use crate::fetcher::Fetcher;
use crate::traits::{HttpTransport, SourceAdapter};
use crate::types::{ConfigError, FetchError, JobListing, RawCandidate, Result, RunReport, SourceError, SourceReport};
use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs every configured source once and reduces the results to one ranked list.
pub struct JobPipeline {
    sources: Vec<Box<dyn SourceAdapter>>,
    fetcher: Fetcher,
    classifier: Classifier,
    aggregator: ListingAggregator,
    source_timeout: Duration,
    max_concurrent_sources: usize,
}

struct SourceOutcome {
    listings: Vec<JobListing>,
    report: SourceReport,
}

impl JobPipeline {
    /// Validate `config` and build every adapter. Once built, a pipeline
    /// never fails a run; broken sources only show up in the report.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Fetcher::new(config.fetch.clone())?;
        Self::assemble(config, fetcher)
    }

    /// Same as [`JobPipeline::new`] but with a caller-supplied HTTP transport.
    pub fn with_transport(config: PipelineConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let fetcher = Fetcher::with_transport(config.fetch.clone(), transport);
        Self::assemble(config, fetcher)
    }

    fn assemble(config: PipelineConfig, fetcher: Fetcher) -> Result<Self> {
        let sources = config
            .sources
            .iter()
            .map(SourceConfig::build)
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        let classifier = Classifier::new(&config.keywords);
        let aggregator = ListingAggregator::new(classifier.clone(), config.run.identity, config.run.max_results);

        info!(
            "Pipeline ready with {} sources (max {} concurrent, {} results)",
            sources.len(),
            config.run.max_concurrent_sources,
            config.run.max_results
        );

        Ok(Self {
            sources,
            fetcher,
            classifier,
            aggregator,
            source_timeout: config.run.source_timeout(),
            max_concurrent_sources: config.run.max_concurrent_sources.max(1),
        })
    }

    /// Append a custom adapter. It runs after the configured ones.
    pub fn add_source(&mut self, source: Box<dyn SourceAdapter>) {
        info!("Adding source to pipeline: {}", source.name());
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self) -> Vec<JobListing> {
        self.run_with_report().await.0
    }

    pub async fn run_with_report(&self) -> (Vec<JobListing>, RunReport) {
        self.run_on(Utc::now().date_naive()).await
    }

    /// Run with every listing stamped as scraped on `scraped_date`.
    pub async fn run_on(&self, scraped_date: NaiveDate) -> (Vec<JobListing>, RunReport) {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting run {} over {} sources", run_id, self.sources.len());

        // `buffered` yields in source order whatever the concurrency.
        let outcomes: Vec<SourceOutcome> = stream::iter(self.sources.iter())
            .map(|source| self.collect_source(&**source, scraped_date))
            .buffered(self.max_concurrent_sources)
            .collect()
            .await;

        let mut merged = Vec::new();
        let mut reports = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            merged.extend(outcome.listings);
            reports.push(outcome.report);
        }

        let merged_count = merged.len();
        let ranked = self.aggregator.rank(merged);

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            scraped_date,
            sources: reports,
            merged: merged_count,
            returned: ranked.len(),
        };
        info!(
            "Run {} finished: {} relevant listings merged, {} returned",
            run_id, report.merged, report.returned
        );

        (ranked, report)
    }

    async fn collect_source(&self, source: &dyn SourceAdapter, scraped_date: NaiveDate) -> SourceOutcome {
        let mut report = SourceReport {
            source: source.name().to_string(),
            queries: source.queries().len(),
            ..Default::default()
        };
        let mut candidates = Vec::new();

        // Candidates land in `candidates` as each query finishes, so a
        // timeout only loses the queries still in flight.
        let pulled = tokio::time::timeout(
            self.source_timeout,
            self.pull_source(source, &mut report, &mut candidates),
        )
        .await
        .unwrap_or_else(|_| {
            Err(SourceError::TimedOut {
                name: source.name().to_string(),
                after: self.source_timeout,
            })
        });

        if let Err(e) = pulled {
            warn!(
                "{}: {} (keeping {} candidates already extracted)",
                report.source,
                e,
                candidates.len()
            );
            report.error = Some(e.to_string());
        }

        report.candidates = candidates.len();
        let listings = self.promote(candidates, scraped_date);
        report.relevant = listings.len();

        info!(
            "{}: {} candidates, {} relevant ({}/{} queries failed)",
            report.source, report.candidates, report.relevant, report.failed_queries, report.queries
        );
        SourceOutcome { listings, report }
    }

    /// Fetch every query of `source` in order, appending what each payload
    /// holds to `candidates`. Fails only when no query produced a payload.
    async fn pull_source(
        &self,
        source: &dyn SourceAdapter,
        report: &mut SourceReport,
        candidates: &mut Vec<RawCandidate>,
    ) -> std::result::Result<(), SourceError> {
        let mut last_error: Option<FetchError> = None;

        for query in source.queries() {
            match self.fetcher.fetch(&query.url).await {
                Ok(payload) => {
                    report.payloads += 1;
                    let payload = payload.with_query_location(query.location.clone());
                    let extracted = source.extract(&payload);
                    debug!("{}: {} candidates from {}", source.name(), extracted.len(), query.url);
                    candidates.extend(extracted);
                }
                Err(e) => {
                    report.failed_queries += 1;
                    warn!("{}: query {} failed: {}", source.name(), query.url, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) if report.payloads == 0 => Err(SourceError::AllQueriesFailed {
                name: source.name().to_string(),
                queries: report.queries,
                last,
            }),
            _ => Ok(()),
        }
    }

    fn promote(&self, candidates: Vec<RawCandidate>, scraped_date: NaiveDate) -> Vec<JobListing> {
        candidates
            .into_iter()
            .filter_map(|candidate| {
                if !self.classifier.is_relevant(&candidate.title) {
                    debug!("Not relevant: '{}' from {}", candidate.title, candidate.source);
                    return None;
                }
                let priority = self.classifier.is_priority(&candidate.title);
                Some(JobListing::promote(candidate, priority, scraped_date))
            })
            .collect()
    }
}
