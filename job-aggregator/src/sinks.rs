use crate::traits::ListingSink;
use crate::types::{JobListing, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::info;

/// Writes the ranked listings as a pretty-printed JSON array, replacing the file.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ListingSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn deliver(&self, listings: &[JobListing]) -> Result<()> {
        let json = serde_json::to_string_pretty(listings)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Wrote {} listings to {}", listings.len(), self.path.display());
        Ok(())
    }
}

/// Headline figures for a batch of listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestStats {
    pub total: usize,
    pub priority: usize,
    /// Distinct locations, sorted.
    pub locations: Vec<String>,
}

impl DigestStats {
    pub fn from_listings(listings: &[JobListing]) -> Self {
        let locations: BTreeSet<&str> = listings.iter().map(|l| l.location()).collect();
        Self {
            total: listings.len(),
            priority: listings.iter().filter(|l| l.priority()).count(),
            locations: locations.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Logs a one-line digest and each listing instead of sending anything.
#[derive(Debug, Default)]
pub struct LogSummarySink;

#[async_trait]
impl ListingSink for LogSummarySink {
    fn name(&self) -> &str {
        "log-summary"
    }

    async fn deliver(&self, listings: &[JobListing]) -> Result<()> {
        let stats = DigestStats::from_listings(listings);
        info!(
            "{} opportunities, {} priority, {} locations",
            stats.total,
            stats.priority,
            stats.locations.len()
        );
        for listing in listings {
            info!(
                "{}{} | {} | {} | {}",
                if listing.priority() { "[priority] " } else { "" },
                listing.title(),
                listing.company(),
                listing.location(),
                listing.url()
            );
        }
        Ok(())
    }
}
