//! Ready-made configurations for boards whose layout we already know.
//! Selector chains list the current markup first and older layouts after it.

use crate::config::{HtmlSourceConfig, QueryTemplate, SelectorConfig, SourceConfig};

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Indeed search results, one query per keyword × location.
pub fn indeed(keywords: &[&str], locations: &[&str]) -> SourceConfig {
    SourceConfig::Html(HtmlSourceConfig {
        name: "Indeed".to_string(),
        base_url: "https://www.indeed.com".to_string(),
        queries: vec![QueryTemplate::Search {
            template: "https://www.indeed.com/jobs?q={keyword}&l={location}".to_string(),
            keywords: owned(keywords),
            locations: owned(locations),
        }],
        max_items_per_query: 5,
        selectors: SelectorConfig {
            item: owned(&["div[data-jk]", "div.job_seen_beacon", "a.tapItem"]),
            title: owned(&["h2.jobTitle", "a.jcs-JobTitle", "h2.title"]),
            company: owned(&["span[data-testid='company-name']", "span.companyName", "span.company"]),
            location: owned(&["div[data-testid='job-location']", "div.companyLocation", "div.location"]),
            link: owned(&["h2.jobTitle a", "a.jcs-JobTitle", "a[href*='viewjob']"]),
            salary: owned(&["span.estimated-salary", "div.salary-snippet-container", "div[data-testid='attribute_snippet_testid']"]),
            description: owned(&["div.job-snippet", "ul li"]),
        },
        default_company: None,
        default_salary: Some("Salary not listed".to_string()),
    })
}

/// LinkedIn's public (guest) job search, one query per keyword.
pub fn linkedin(keywords: &[&str]) -> SourceConfig {
    SourceConfig::Html(HtmlSourceConfig {
        name: "LinkedIn".to_string(),
        base_url: "https://www.linkedin.com".to_string(),
        queries: vec![QueryTemplate::Search {
            template: "https://www.linkedin.com/jobs/search/?keywords={keyword}".to_string(),
            keywords: owned(keywords),
            locations: Vec::new(),
        }],
        max_items_per_query: 8,
        selectors: SelectorConfig {
            item: owned(&["div.base-card", "div.job-search-card", "li.result-card"]),
            title: owned(&["h3.base-search-card__title", "h3.result-card__title"]),
            company: owned(&["h4.base-search-card__subtitle", "h4.result-card__subtitle"]),
            location: owned(&["span.job-search-card__location", "span.job-result-card__location"]),
            link: owned(&["a.base-card__full-link", "a.result-card__full-card-link"]),
            salary: owned(&["span.job-search-card__salary-info"]),
            description: Vec::new(),
        },
        default_company: None,
        default_salary: Some("Check listing".to_string()),
    })
}
