pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod selectors;
pub mod sinks;
pub mod sources;
pub mod traits;
pub mod types;
pub mod utils;

pub use aggregator::ListingAggregator;
pub use classifier::Classifier;
pub use config::{IdentityScheme, KeywordConfig, PipelineConfig, QueryTemplate, RunConfig, SourceConfig};
pub use dedup::{dedupe, listing_id, Deduplicator};
pub use fetcher::{Fetcher, ReqwestTransport};
pub use parser::FeedParser;
pub use pipeline::JobPipeline;
pub use sinks::{DigestStats, JsonFileSink, LogSummarySink};
pub use sources::{FeedSource, HtmlBoardSource};
pub use traits::{HttpRequest, HttpResponse, HttpTransport, ListingSink, SourceAdapter};
pub use types::*;
