//! Crawler module for walking a paginated listing
//!
//! This module contains the core scraping logic, including:
//! - Page loading through the run's browsing session
//! - Page-count resolution from the first page
//! - Card extraction from each page's markup
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod pagination;
mod parser;

pub use coordinator::Coordinator;
pub use fetcher::{FetchOutcome, PageFetcher, PageRef, RawPage};
pub use pagination::{resolve_page_count, resolve_page_count_from_markup, PageCountError};
pub use parser::{
    check_markup, extract_cards, extract_cards_from_markup, ListingLayout, MalformedMarkup,
};

use crate::config::Config;
use crate::report::RunReport;
use crate::SweepError;

/// Runs one complete scrape with the configured session backend
///
/// # Arguments
///
/// * `config` - The run configuration
///
/// # Returns
///
/// * `Ok(RunReport)` - The run's report, which may itself carry failures
/// * `Err(SweepError)` - The configuration could not be turned into a coordinator
pub async fn run_once(config: &Config) -> Result<RunReport, SweepError> {
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.run().await)
}
