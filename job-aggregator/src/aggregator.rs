use crate::classifier::Classifier;
use crate::config::IdentityScheme;
use crate::dedup::Deduplicator;
use crate::types::JobListing;
use tracing::{debug, info};

/// Turns the merged listings of a run into the final ranked list:
/// geography filter, dedupe, stable sort, truncate. Pure and synchronous.
#[derive(Debug, Clone)]
pub struct ListingAggregator {
    classifier: Classifier,
    deduplicator: Deduplicator,
    max_results: usize,
}

impl ListingAggregator {
    pub fn new(classifier: Classifier, identity: IdentityScheme, max_results: usize) -> Self {
        Self {
            classifier,
            deduplicator: Deduplicator::new(identity),
            max_results,
        }
    }

    pub fn rank(&self, listings: Vec<JobListing>) -> Vec<JobListing> {
        let merged = listings.len();

        let in_region: Vec<JobListing> = listings
            .into_iter()
            .filter(|listing| {
                let keep = self.classifier.is_target_location(listing.location());
                if !keep {
                    debug!("Outside target regions: '{}' in {}", listing.title(), listing.location());
                }
                keep
            })
            .collect();
        let in_region_count = in_region.len();

        let mut unique = self.deduplicator.dedupe(in_region);
        let unique_count = unique.len();

        // Vec::sort_by is stable: equal keys keep merge order.
        unique.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| b.scraped_date().cmp(&a.scraped_date()))
        });
        unique.truncate(self.max_results);

        info!(
            "Ranked {} listings: {} in target regions, {} unique, returning {}",
            merged,
            in_region_count,
            unique_count,
            unique.len()
        );
        unique
    }
}

/// One-shot form of [`ListingAggregator::rank`].
pub fn rank(
    listings: Vec<JobListing>,
    classifier: &Classifier,
    identity: IdentityScheme,
    max_results: usize,
) -> Vec<JobListing> {
    ListingAggregator::new(classifier.clone(), identity, max_results).rank(listings)
}
