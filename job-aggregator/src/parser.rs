use crate::types::ExtractionError;
use feed_rs::parser;
use tracing::debug;

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug)]
pub struct ParsedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub summary: Option<String>,
}

/// RSS/Atom parsing for job feeds.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_feed(content: &str) -> Result<ParsedFeed, ExtractionError> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| ExtractionError::InvalidFeed(e.to_string()))?;

        let title = feed.title.map(|t| t.content);
        let entries = feed.entries.into_iter().map(Self::parse_entry).collect();

        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> ParsedEntry {
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body));

        ParsedEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            author: entry.authors.first().map(|a| a.name.clone()),
            categories: entry.categories.into_iter().map(|c| c.label.unwrap_or(c.term)).collect(),
            summary,
        }
    }

    /// Cheap sniff for RSS/Atom markup before handing a body to the parser.
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        let has_feed_indicators = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        has_feed_indicators && content.trim_start().starts_with('<')
    }
}
