//! Run coordinator - the page walk that produces a run report
//!
//! This module drives one run end to end:
//! - Opening the browsing session and closing it on every path
//! - Loading page 1 and resolving the page count from it
//! - Walking pages 2..=count in order, one attempt each
//! - Turning every stage failure into an error log entry
//!
//! Nothing escapes [`Coordinator::run`]: a failed stage only reduces the data the report
//! carries.

use crate::config::{Config, ReportConfig};
use crate::crawler::fetcher::{FetchOutcome, PageFetcher, PageRef};
use crate::crawler::pagination::{resolve_page_count_from_markup, PageCountError};
use crate::crawler::parser::{check_markup, extract_cards_from_markup, ListingLayout};
use crate::report::{ErrorLog, ExtractedRecord, FailureEntry, FailureKind, RunReport, StageTag};
use crate::session::{BrowserSession, ConfiguredLauncher, SessionLauncher};
use crate::state::RunPhase;
use crate::ConfigError;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use url::Url;

/// Page-count resolution run on the blocking pool
type CountStage = fn(&str, &ListingLayout) -> Result<u32, PageCountError>;

/// Card extraction run on the blocking pool
type ExtractStage = fn(&str, &ListingLayout) -> Vec<ExtractedRecord>;

/// Main run coordinator structure
pub struct Coordinator {
    fetcher: PageFetcher,
    layout: Arc<ListingLayout>,
    report_policy: ReportConfig,
    launcher: Box<dyn SessionLauncher>,
    count_stage: CountStage,
    extract_stage: ExtractStage,
}

impl Coordinator {
    /// Creates a coordinator that launches the configured session backend
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(ConfigError)` - The base URL or a selector could not be compiled
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let launcher = ConfiguredLauncher::new(config.session.clone());
        Self::with_launcher(config, Box::new(launcher))
    }

    /// Creates a coordinator that opens its session through `launcher`
    pub fn with_launcher(
        config: &Config,
        launcher: Box<dyn SessionLauncher>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.target, &config.session)?,
            layout: Arc::new(ListingLayout::from_target(&config.target)?),
            report_policy: config.report.clone(),
            launcher,
            count_stage: resolve_page_count_from_markup,
            extract_stage: extract_cards_from_markup,
        })
    }

    /// Replaces the blocking-pool stages
    #[cfg(test)]
    fn with_stages(mut self, count_stage: CountStage, extract_stage: ExtractStage) -> Self {
        self.count_stage = count_stage;
        self.extract_stage = extract_stage;
        self
    }

    /// The URL a run loads for `page`
    pub fn page_url(&self, page: PageRef) -> Url {
        self.fetcher.page_url(page)
    }

    /// Runs one scrape and returns its report
    ///
    /// This never fails: a report is produced even when the session cannot be opened.
    pub async fn run(&self) -> RunReport {
        let start_time = Instant::now();
        let mut phase = RunPhase::Init;
        let mut errors = ErrorLog::new();

        tracing::info!("Starting run at {}", self.page_url(PageRef::FIRST));

        let (page_count, records) = match self.launcher.launch().await {
            Ok(mut session) => {
                let walked = self
                    .walk_pages(session.as_mut(), &mut phase, &mut errors)
                    .await;

                if let Err(e) = session.close().await {
                    tracing::warn!("Failed to close browsing session: {}", e);
                }
                walked
            }
            Err(e) => {
                errors.push(FailureEntry::new(
                    StageTag::Session,
                    FailureKind::Session,
                    e.to_string(),
                ));
                (1, Vec::new())
            }
        };

        phase.advance(RunPhase::Done);

        let report = RunReport::assemble(page_count, records, &errors, &self.report_policy);
        tracing::info!(
            "Run completed in {:?}: {} page(s), {} record(s), {} failure(s)",
            start_time.elapsed(),
            report.page_count,
            report.record_count,
            errors.len()
        );

        report
    }

    /// Walks the listing and returns the page count with every extracted record
    async fn walk_pages(
        &self,
        session: &mut dyn BrowserSession,
        phase: &mut RunPhase,
        errors: &mut ErrorLog,
    ) -> (u32, Vec<ExtractedRecord>) {
        let mut page = PageRef::FIRST;

        phase.advance(RunPhase::Fetching(page.number()));
        let outcome = self.fetcher.fetch(session, page).await;
        if !self.accept(&outcome, page, errors) {
            return (1, Vec::new());
        }
        let markup = self.checked(outcome.into_markup(), page, errors);

        phase.advance(RunPhase::Counting);
        let page_count = match &markup {
            Some(markup) => self.resolve_count(markup.clone(), errors).await,
            None => 1,
        };
        tracing::info!("Listing has {} page(s)", page_count);

        phase.advance(RunPhase::Extracting(page.number()));
        let mut records = self.extract(markup, page, errors).await;

        while page.number() < page_count {
            page = page.next();

            phase.advance(RunPhase::Fetching(page.number()));
            let outcome = self.fetcher.fetch(session, page).await;
            if !self.accept(&outcome, page, errors) {
                tracing::warn!("Session lost at page {}, stopping", page);
                break;
            }
            let markup = self.checked(outcome.into_markup(), page, errors);

            phase.advance(RunPhase::Extracting(page.number()));
            records.extend(self.extract(markup, page, errors).await);
        }

        (page_count, records)
    }

    /// Records a failed fetch
    ///
    /// Returns false when the session is gone and the walk must stop.
    fn accept(&self, outcome: &FetchOutcome, page: PageRef, errors: &mut ErrorLog) -> bool {
        let n = page.number();

        match outcome {
            FetchOutcome::Ready(_) => true,
            FetchOutcome::LoadFailed { url, error } => {
                let kind = if error.is_timeout() {
                    FailureKind::Timeout
                } else {
                    FailureKind::Navigation
                };
                errors.push(
                    FailureEntry::new(StageTag::Load(n), kind, error.to_string()).with_context(url),
                );
                true
            }
            FetchOutcome::EmptyMarkup { url } => {
                errors.push(
                    FailureEntry::new(
                        StageTag::Html(n),
                        FailureKind::EmptyMarkup,
                        "page source was empty",
                    )
                    .with_context(url),
                );
                true
            }
            FetchOutcome::SessionLost { url, error } => {
                errors.push(
                    FailureEntry::new(
                        StageTag::Session,
                        FailureKind::Session,
                        format!("session ended mid-run: {}", error),
                    )
                    .with_context(url),
                );
                false
            }
        }
    }

    /// Drops content that is not markup, recording a parse failure for it
    fn checked(
        &self,
        markup: Option<String>,
        page: PageRef,
        errors: &mut ErrorLog,
    ) -> Option<String> {
        let markup = markup?;

        match check_markup(&markup) {
            Ok(()) => Some(markup),
            Err(e) => {
                errors.record(
                    StageTag::Parse(page.number()),
                    FailureKind::MalformedMarkup,
                    e.to_string(),
                );
                None
            }
        }
    }

    /// Resolves the page count on the blocking pool, falling back to 1 on any failure
    async fn resolve_count(&self, markup: String, errors: &mut ErrorLog) -> u32 {
        let layout = Arc::clone(&self.layout);
        let count_stage = self.count_stage;
        let joined = tokio::task::spawn_blocking(move || count_stage(&markup, &layout)).await;

        match joined {
            Ok(Ok(count)) => count,
            Ok(Err(e)) => {
                errors.record(StageTag::PageCount, FailureKind::InvalidCount, e.to_string());
                1
            }
            Err(e) => {
                errors.record(StageTag::PageCount, FailureKind::Panic, join_failure(e));
                1
            }
        }
    }

    /// Extracts a page's records on the blocking pool
    ///
    /// A page whose markup was usable but held no cards is flagged as having no items.
    async fn extract(
        &self,
        markup: Option<String>,
        page: PageRef,
        errors: &mut ErrorLog,
    ) -> Vec<ExtractedRecord> {
        let Some(markup) = markup else {
            return Vec::new();
        };

        let layout = Arc::clone(&self.layout);
        let extract_stage = self.extract_stage;
        let joined = tokio::task::spawn_blocking(move || extract_stage(&markup, &layout)).await;

        match joined {
            Ok(records) if records.is_empty() => {
                errors.record(
                    StageTag::NoItems(page.number()),
                    FailureKind::NoItems,
                    "page loaded but yielded no records",
                );
                records
            }
            Ok(records) => {
                tracing::info!("Page {}: {} record(s)", page, records.len());
                records
            }
            Err(e) => {
                errors.record(
                    StageTag::Extract(page.number()),
                    FailureKind::Panic,
                    join_failure(e),
                );
                Vec::new()
            }
        }
    }
}

/// Describes a blocking task that did not complete
fn join_failure(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task cancelled".to_string();
    }

    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());

    format!("task panicked: {}", message)
}
