/// Text cleanup for values scraped out of markup
pub mod text {
    /// Collapse runs of whitespace. DOM text from `scraper` is already
    /// entity-decoded, so nothing else is touched.
    pub fn normalize(raw: &str) -> String {
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Normalized text, or `None` when nothing but whitespace is left.
    pub fn non_empty(raw: &str) -> Option<String> {
        let cleaned = normalize(raw);
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    /// Like [`non_empty`], but first decodes HTML entities. Feed fields often
    /// carry escaped markup that the XML parser leaves in place.
    pub fn non_empty_decoded(raw: &str) -> Option<String> {
        non_empty(&html_escape::decode_html_entities(raw))
    }

    /// Truncate at a char boundary, appending an ellipsis when cut.
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        match cut.rfind(' ') {
            Some(space) if space > 0 => format!("{}...", &cut[..space]),
            _ => format!("{}...", cut),
        }
    }
}

/// URL helpers for source adapters and query templates
pub mod links {
    use url::{form_urlencoded, Url};

    /// Resolve an `href` found on a page against the source's base URL.
    /// Absolute links pass through unchanged.
    pub fn resolve(base: &Url, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href == "#" || href.starts_with("javascript:") {
            return None;
        }
        base.join(href).ok().map(|u| u.to_string())
    }

    /// Form-encode a value for substitution into a query string (`a b` -> `a+b`).
    pub fn encode_query_value(value: &str) -> String {
        form_urlencoded::byte_serialize(value.trim().as_bytes()).collect()
    }

    /// Extract host from URL
    pub fn host(url_str: &str) -> Option<String> {
        Url::parse(url_str).ok().and_then(|u| u.host_str().map(str::to_string))
    }

    pub fn is_http_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}
