//! Page-count resolution
//!
//! The count comes from page 1 only, in two tiers: the listing's own `current / total`
//! counter first, then the highest page number linked from the page.

use crate::crawler::parser::ListingLayout;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use thiserror::Error;

/// A page number was found but could not be read as a count
#[derive(Debug, Error)]
pub enum PageCountError {
    #[error("counter total is not a valid page count: {text:?}")]
    Counter { text: String },

    #[error("pagination link carries an invalid page number: {href}")]
    Link { href: String },
}

fn counter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]+)\s*/\s*([0-9]+)").expect("counter pattern is a valid regex")
    })
}

/// Resolves how many pages the listing has
///
/// Returns 1 when neither tier yields a number; the result is never below 1.
pub fn resolve_page_count(document: &Html, layout: &ListingLayout) -> Result<u32, PageCountError> {
    if let Some(total) = count_from_counter(document, layout)? {
        tracing::debug!("Page count {} from counter", total);
        return Ok(total.max(1));
    }

    match count_from_links(document, layout)? {
        Some(highest) => {
            tracing::debug!("Page count {} from pagination links", highest);
            Ok(highest.max(1))
        }
        None => {
            tracing::debug!("No page count found, assuming a single page");
            Ok(1)
        }
    }
}

/// Parses `markup` and resolves its page count
pub fn resolve_page_count_from_markup(
    markup: &str,
    layout: &ListingLayout,
) -> Result<u32, PageCountError> {
    let document = Html::parse_document(markup);
    resolve_page_count(&document, layout)
}

/// Reads the total from the first counter element showing `current / total`
fn count_from_counter(
    document: &Html,
    layout: &ListingLayout,
) -> Result<Option<u32>, PageCountError> {
    for element in document.select(&layout.counter) {
        let text = element.text().collect::<String>();
        let Some(captures) = counter_pattern().captures(&text) else {
            continue;
        };

        let total = captures[2]
            .parse::<u32>()
            .map_err(|_| PageCountError::Counter { text: text.trim().to_string() })?;
        return Ok(Some(total));
    }

    Ok(None)
}

/// Finds the highest page number among the page's links
///
/// Links whose page parameter is not a plain number are ignored.
fn count_from_links(
    document: &Html,
    layout: &ListingLayout,
) -> Result<Option<u32>, PageCountError> {
    let mut highest: Option<u32> = None;

    for anchor in document.select(&layout.link) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = layout.base_url.join(href) else {
            continue;
        };

        let Some(value) = resolved
            .query_pairs()
            .find(|(key, _)| key == layout.page_param.as_str())
            .map(|(_, value)| value.into_owned())
        else {
            continue;
        };

        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        let page = value.parse::<u32>().map_err(|_| PageCountError::Link {
            href: href.to_string(),
        })?;
        highest = Some(highest.map_or(page, |current| current.max(page)));
    }

    Ok(highest)
}
