//! Page fetcher
//!
//! This module loads one listing page through the run's browsing session:
//! - Building the page URL from the base URL and page number
//! - Bounded waits for navigation, document readiness and the card container
//! - Best-effort scrolling and a settle delay for lazy-loaded cards
//! - Classifying the outcome without ever retrying

use crate::config::{SessionConfig, TargetConfig};
use crate::session::{BrowserSession, SessionError};
use crate::ConfigError;
use std::fmt;
use std::time::Duration;
use url::{form_urlencoded, Url};

/// 1-based page number within the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef(u32);

impl PageRef {
    pub const FIRST: PageRef = PageRef(1);

    /// Returns a page reference, or `None` for page 0
    pub fn new(number: u32) -> Option<Self> {
        (number >= 1).then_some(Self(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn is_first(self) -> bool {
        self.0 == 1
    }

    /// The page after this one
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Markup read from one page
#[derive(Debug, Clone)]
pub struct RawPage {
    pub page: PageRef,
    pub markup: String,
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Page loaded and produced non-empty markup
    Ready(RawPage),

    /// Navigation failed or a bounded wait expired
    LoadFailed {
        /// The URL that was being loaded
        url: String,
        /// The session failure
        error: SessionError,
    },

    /// Every wait succeeded but the document was empty
    EmptyMarkup {
        /// The URL that was loaded
        url: String,
    },

    /// The browsing session is gone; no further page can be loaded
    SessionLost {
        /// The URL that was being loaded
        url: String,
        /// The session failure
        error: SessionError,
    },
}

impl FetchOutcome {
    /// Takes the markup of a successfully loaded page
    pub fn into_markup(self) -> Option<String> {
        match self {
            Self::Ready(page) => Some(page.markup),
            _ => None,
        }
    }
}

/// Loads listing pages with the configured waits
#[derive(Debug, Clone)]
pub struct PageFetcher {
    base_url: Url,
    page_param: String,
    ready_selector: String,
    load_timeout: Duration,
    settle_delay: Duration,
}

impl PageFetcher {
    /// Creates a fetcher for the configured listing
    ///
    /// # Arguments
    ///
    /// * `target` - Listing URL, page parameter and card selector
    /// * `session` - Load timeout and settle delay
    pub fn new(target: &TargetConfig, session: &SessionConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&target.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

        Ok(Self {
            base_url,
            page_param: target.page_param.clone(),
            ready_selector: target.card_selector.clone(),
            load_timeout: Duration::from_secs(session.load_timeout_secs),
            settle_delay: Duration::from_millis(session.settle_delay_ms),
        })
    }

    /// Builds the URL for `page`
    ///
    /// Page 1 is the base URL unchanged. Later pages set the page query parameter,
    /// replacing any value the base URL already carries. The rest of the query is kept
    /// as written.
    pub fn page_url(&self, page: PageRef) -> Url {
        if page.is_first() {
            return self.base_url.clone();
        }

        let key: String = form_urlencoded::byte_serialize(self.page_param.as_bytes()).collect();
        let mut segments: Vec<&str> = self
            .base_url
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|segment| !segment.is_empty())
            .filter(|segment| segment.split('=').next() != Some(key.as_str()))
            .collect();

        let page_pair = format!("{}={}", key, page);
        segments.push(&page_pair);

        let mut url = self.base_url.clone();
        url.set_query(Some(&segments.join("&")));
        url
    }

    /// Loads `page` in `session` and reads its markup
    ///
    /// Never retries. A failure that shows the session itself is gone is reported as
    /// [`FetchOutcome::SessionLost`].
    pub async fn fetch(&self, session: &mut dyn BrowserSession, page: PageRef) -> FetchOutcome {
        let url = self.page_url(page);
        tracing::info!("Fetching page {}: {}", page, url);

        match self.load(session, &url).await {
            Ok(markup) if markup.trim().is_empty() => FetchOutcome::EmptyMarkup {
                url: url.to_string(),
            },
            Ok(markup) => {
                tracing::debug!("Page {} returned {} bytes", page, markup.len());
                FetchOutcome::Ready(RawPage { page, markup })
            }
            Err(error) if error.is_fatal() => FetchOutcome::SessionLost {
                url: url.to_string(),
                error,
            },
            Err(error) => FetchOutcome::LoadFailed {
                url: url.to_string(),
                error,
            },
        }
    }

    async fn load(
        &self,
        session: &mut dyn BrowserSession,
        url: &Url,
    ) -> Result<String, SessionError> {
        session.navigate(url, self.load_timeout).await?;
        session.wait_until_ready(self.load_timeout).await?;
        session
            .wait_for_selector(&self.ready_selector, self.load_timeout)
            .await?;

        if let Err(e) = session.scroll_to_bottom().await {
            tracing::debug!("Scroll failed on {}: {}", url, e);
        }

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        session.page_source().await
    }
}
