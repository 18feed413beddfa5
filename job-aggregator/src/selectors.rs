//! Fallback selector chains.
//!
//! Job boards reshuffle their markup often, so each field is described by an
//! ordered list of CSS selectors. The first selector that yields a usable
//! value wins; later entries only matter once the earlier ones stop matching.

use crate::utils::text;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SelectorChain {
    patterns: Vec<(String, Selector)>,
}

/// A selector string that failed to parse, with the parser's reason.
#[derive(Debug, Clone)]
pub struct InvalidSelector {
    pub selector: String,
    pub reason: String,
}

impl SelectorChain {
    pub fn parse<S: AsRef<str>>(patterns: &[S]) -> Result<Self, InvalidSelector> {
        let mut parsed = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            let selector = Selector::parse(pattern).map_err(|e| InvalidSelector {
                selector: pattern.to_string(),
                reason: e.to_string(),
            })?;
            parsed.push((pattern.to_string(), selector));
        }
        Ok(Self { patterns: parsed })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Items matched by the first pattern that matches anything in the document.
    pub fn select_items<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for (index, (pattern, selector)) in self.patterns.iter().enumerate() {
            let items: Vec<ElementRef<'a>> = document.select(selector).collect();
            if !items.is_empty() {
                if index > 0 {
                    debug!("Fell back to item selector '{}'", pattern);
                }
                return items;
            }
        }
        Vec::new()
    }

    /// Normalized text of the first element (under `scope`) with non-empty text.
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.patterns.iter().find_map(|(_, selector)| {
            scope
                .select(selector)
                .find_map(|el| text::non_empty(&el.text().collect::<Vec<_>>().join(" ")))
        })
    }

    /// First non-empty value of `attr` on an element matched under `scope`.
    pub fn first_attr(&self, scope: ElementRef<'_>, attr: &str) -> Option<String> {
        self.patterns.iter().find_map(|(_, selector)| {
            scope
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
    }
}
