use crate::config::IdentityScheme;
use crate::types::JobListing;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

/// Join the fields with `-`, lower-case, then drop every character outside
/// `[a-z0-9-]`. Spaces and punctuation disappear entirely, so
/// "Camera Operator" and "camera-operator" differ but "D.O.P." and "dop" do not.
pub fn canonical_key(fields: &[&str]) -> String {
    fields
        .join("-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Fingerprint of the normalized `(title, company, location)` triple.
pub fn listing_id(title: &str, company: &str, location: &str) -> String {
    let key = canonical_key(&[title, company, location]);
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// Collapses the same posting seen on several boards. First occurrence wins
/// and survivors keep their input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    scheme: IdentityScheme,
}

impl Deduplicator {
    pub fn new(scheme: IdentityScheme) -> Self {
        Self { scheme }
    }

    pub fn key_for(&self, listing: &JobListing) -> String {
        match self.scheme {
            IdentityScheme::TitleCompanyLocation => listing.id().to_string(),
            IdentityScheme::TitleCompany => canonical_key(&[listing.title(), listing.company()]),
        }
    }

    pub fn dedupe(&self, listings: Vec<JobListing>) -> Vec<JobListing> {
        let mut seen = HashSet::with_capacity(listings.len());
        let before = listings.len();

        let unique: Vec<JobListing> = listings
            .into_iter()
            .filter(|listing| {
                let fresh = seen.insert(self.key_for(listing));
                if !fresh {
                    debug!("Dropping duplicate '{}' from {}", listing.title(), listing.source());
                }
                fresh
            })
            .collect();

        if unique.len() < before {
            debug!("Removed {} duplicate listings", before - unique.len());
        }
        unique
    }
}

/// Dedupe on the full `(title, company, location)` identity.
pub fn dedupe(listings: Vec<JobListing>) -> Vec<JobListing> {
    Deduplicator::default().dedupe(listings)
}
