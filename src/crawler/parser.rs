//! Listing markup parsing
//!
//! This module turns a page's markup into listing records:
//! - a plausibility check that rejects content which is not markup at all
//! - the compiled selectors describing the listing layout
//! - card extraction, one [`ExtractedRecord`] per card that carries any text

use crate::config::TargetConfig;
use crate::report::ExtractedRecord;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Content that could not be treated as markup
#[derive(Debug, Error)]
#[error("content is not markup (starts with {preview:?})")]
pub struct MalformedMarkup {
    pub preview: String,
}

/// Compiled selectors and URL rules for one listing site
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub(crate) card: Selector,
    pub(crate) row: Selector,
    pub(crate) counter: Selector,
    pub(crate) link: Selector,
    pub(crate) base_url: Url,
    pub(crate) page_param: String,
}

impl ListingLayout {
    /// Compiles the selectors named in the target configuration
    pub fn from_target(target: &TargetConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            card: compile("card-selector", &target.card_selector)?,
            row: compile("row-selector", &target.row_selector)?,
            counter: compile("counter-selector", &target.counter_selector)?,
            link: compile("link-selector", "a[href]")?,
            base_url: Url::parse(&target.base_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?,
            page_param: target.page_param.clone(),
        })
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })
}

/// Checks that non-empty content looks like markup
///
/// The HTML parser recovers from any input, so the only content rejected here is content
/// that does not open with a tag (an error string, JSON, a plain-text block page).
pub fn check_markup(markup: &str) -> Result<(), MalformedMarkup> {
    let trimmed = markup.trim_start_matches('\u{feff}').trim_start();

    if trimmed.is_empty() || trimmed.starts_with('<') {
        return Ok(());
    }

    Err(MalformedMarkup {
        preview: trimmed.chars().take(40).collect(),
    })
}

/// Extracts one record per listing card, in document order
///
/// # Extraction Rules
///
/// - Each card contributes every text node inside each of its rows, in document order
/// - Text is whitespace-normalized; whitespace-only text is skipped
/// - A card with no text at all is dropped without being counted or reported
/// - Kept cards are numbered from 1
pub fn extract_cards(document: &Html, layout: &ListingLayout) -> Vec<ExtractedRecord> {
    let mut records = Vec::new();

    for card in document.select(&layout.card) {
        let fields = card_fields(card, &layout.row);

        // Cards without text are never numbered
        if fields.is_empty() {
            tracing::trace!("Dropping card without text");
            continue;
        }

        records.push(ExtractedRecord {
            index: records.len() as u32 + 1,
            fields,
        });
    }

    records
}

/// Convenience wrapper that parses `markup` before extracting
///
/// Empty or garbage input yields no records.
pub fn extract_cards_from_markup(markup: &str, layout: &ListingLayout) -> Vec<ExtractedRecord> {
    let document = Html::parse_document(markup);
    extract_cards(&document, layout)
}

/// Collects the text fragments of one card
///
/// Every text node inside a row is one fragment, so text sitting beside an icon or a
/// `<br>` is kept alongside text wrapped in its own element.
fn card_fields(card: ElementRef<'_>, row_selector: &Selector) -> Vec<String> {
    let mut fields = Vec::new();

    for row in card.select(row_selector) {
        for text in row.text() {
            let normalized = normalize_text(text);
            if !normalized.is_empty() {
                fields.push(normalized);
            }
        }
    }

    fields
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
