//! Browsing sessions
//!
//! A run drives every page load through one long-lived [`BrowserSession`], so cookies,
//! consent state and challenge state established on page 1 carry over to later pages.
//! Two backends exist:
//!
//! - [`HttpSession`]: plain HTTP with a persistent cookie store
//! - [`WebDriverSession`]: a Chrome session driven over the WebDriver protocol
//!
//! All waits take an explicit timeout; no session operation may block indefinitely.

mod http;
mod webdriver;

pub use http::HttpSession;
pub use webdriver::WebDriverSession;

use crate::config::{SessionBackend, SessionConfig};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by a browsing session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch session: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("session lost: {0}")]
    Lost(String),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("no page has been loaded in this session")]
    NoPage,
}

impl SessionError {
    /// True when the session itself is unusable and no further page can be loaded
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Launch(_) | Self::Lost(_))
    }

    /// True when a bounded wait expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// One browsing context, exclusively owned by a single run
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigates the session to `url`
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), SessionError>;

    /// Waits until the current document has finished loading
    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), SessionError>;

    /// Waits until an element matching `selector` is visible
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError>;

    /// Scrolls to the bottom of the document to trigger lazy-loaded content
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError>;

    /// Returns the current document's markup
    async fn page_source(&mut self) -> Result<String, SessionError>;

    /// Ends the session and releases its resources
    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}

/// Opens a fresh session at the start of a run
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError>;
}

/// Launches the backend selected in the session configuration
pub struct ConfiguredLauncher {
    config: SessionConfig,
}

impl ConfiguredLauncher {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for ConfiguredLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, SessionError> {
        match self.config.backend {
            SessionBackend::Http => {
                tracing::debug!("Opening HTTP session");
                Ok(Box::new(HttpSession::new(&self.config)?))
            }
            SessionBackend::Webdriver => {
                tracing::debug!("Opening WebDriver session at {}", self.config.webdriver_url);
                Ok(Box::new(WebDriverSession::launch(&self.config).await?))
            }
        }
    }
}
