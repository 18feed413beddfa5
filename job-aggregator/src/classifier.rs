use crate::config::KeywordConfig;

/// Keyword predicates over candidate titles and locations.
///
/// Matching is case-insensitive substring containment, so `"uk"` also
/// matches `"Dukes"`; keyword lists should be chosen with that in mind.
#[derive(Debug, Clone)]
pub struct Classifier {
    relevance: Vec<String>,
    priority: Vec<String>,
    target_locations: Vec<String>,
}

impl Classifier {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            relevance: lowered(&config.relevance),
            priority: lowered(&config.priority),
            target_locations: lowered(&config.target_locations),
        }
    }

    /// Title belongs to the niche at all. Candidates failing this never reach the merge.
    pub fn is_relevant(&self, title: &str) -> bool {
        contains_any(title, &self.relevance)
    }

    /// Title looks like higher-value work (series, features, streamers).
    pub fn is_priority(&self, title: &str) -> bool {
        contains_any(title, &self.priority)
    }

    pub fn is_target_location(&self, location: &str) -> bool {
        contains_any(location, &self.target_locations)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

fn lowered(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
