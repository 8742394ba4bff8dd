//! HTTP-backed session
//!
//! Loads pages with a single `reqwest` client whose cookie store persists for the whole
//! run. There is no script execution, so the document is "ready" as soon as the response
//! body has arrived and an element is "visible" when it is present in that body.

use crate::config::SessionConfig;
use crate::session::{BrowserSession, SessionError};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// Session that fetches markup over plain HTTP
pub struct HttpSession {
    client: Client,
    current: Option<String>,
}

impl HttpSession {
    /// Builds the HTTP client for one run
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration (user agent and load timeout)
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.load_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        Ok(Self {
            client,
            current: None,
        })
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), SessionError> {
        self.current = None;

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e, timeout))?;

        tracing::trace!("Loaded {} ({} bytes)", url, body.len());
        self.current = Some(body);
        Ok(())
    }

    async fn wait_until_ready(&mut self, _timeout: Duration) -> Result<(), SessionError> {
        match self.current {
            Some(_) => Ok(()),
            None => Err(SessionError::NoPage),
        }
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let markup = self.current.clone().ok_or(SessionError::NoPage)?;
        let css = selector.to_string();
        let found = tokio::task::spawn_blocking(move || contains_selector(&markup, &css))
            .await
            .map_err(|e| SessionError::Driver(format!("selector check failed: {}", e)))??;

        // Static markup never changes, so an absent element is a wait that would expire
        if found {
            Ok(())
        } else {
            Err(SessionError::Timeout {
                what: format!("selector `{}`", selector),
                after: timeout,
            })
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Checks whether any element in `markup` matches `selector`
fn contains_selector(markup: &str, selector: &str) -> Result<bool, SessionError> {
    let selector = Selector::parse(selector)
        .map_err(|e| SessionError::Driver(format!("invalid selector `{}`: {:?}", selector, e)))?;
    let document = Html::parse_document(markup);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

/// Maps a reqwest failure onto the session error taxonomy
fn classify_error(url: &Url, error: reqwest::Error, timeout: Duration) -> SessionError {
    if error.is_timeout() {
        SessionError::Timeout {
            what: format!("response from {}", url),
            after: timeout,
        }
    } else if error.is_connect() {
        SessionError::Navigation {
            url: url.to_string(),
            message: "Connection refused".to_string(),
        }
    } else {
        SessionError::Navigation {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
