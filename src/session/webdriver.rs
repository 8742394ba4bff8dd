//! WebDriver-backed session
//!
//! Drives a real Chrome instance through a WebDriver server so script-rendered listings
//! and lazy-loaded cards are present before the markup is read.

use crate::config::SessionConfig;
use crate::session::{BrowserSession, SessionError};
use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use url::Url;

/// Interval between polls while waiting on the browser
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const READY_STATE_SCRIPT: &str = "return document.readyState;";
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Session backed by a Chrome browser over WebDriver
pub struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    /// Starts a browser with the configured launch options
    pub async fn launch(config: &SessionConfig) -> Result<Self, SessionError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in config.browser.to_args(&config.user_agent) {
            caps.add_arg(&arg)
                .map_err(|e| SessionError::Launch(e.to_string()))?;
        }

        let driver = WebDriver::new(config.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        tracing::info!("Browser session started via {}", config.webdriver_url);
        Ok(Self { driver })
    }

    async fn ready_state(&self) -> Result<String, SessionError> {
        let ret = self
            .driver
            .execute(READY_STATE_SCRIPT, Vec::new())
            .await
            .map_err(classify_error)?;
        Ok(ret.json().as_str().unwrap_or_default().to_string())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<(), SessionError> {
        match tokio::time::timeout(timeout, self.driver.goto(url.as_str())).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => match classify_error(e) {
                SessionError::Driver(message) => Err(SessionError::Navigation {
                    url: url.to_string(),
                    message,
                }),
                other => Err(other),
            },
            Err(_) => Err(SessionError::Timeout {
                what: format!("navigation to {}", url),
                after: timeout,
            }),
        }
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let poll = async {
            loop {
                if self.ready_state().await? == "complete" {
                    return Ok(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout {
                what: "document.readyState == complete".to_string(),
                after: timeout,
            }),
        }
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SessionError> {
        let element_query = self
            .driver
            .query(By::Css(selector.to_string()))
            .wait(timeout, POLL_INTERVAL)
            .and_displayed();

        // Outer bound in case the driver ignores its own wait
        match tokio::time::timeout(timeout + POLL_INTERVAL, element_query.first()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => match classify_error(e) {
                SessionError::Driver(_) => Err(SessionError::Timeout {
                    what: format!("selector `{}`", selector),
                    after: timeout,
                }),
                other => Err(other),
            },
            Err(_) => Err(SessionError::Timeout {
                what: format!("selector `{}`", selector),
                after: timeout,
            }),
        }
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), SessionError> {
        self.driver
            .execute(SCROLL_SCRIPT, Vec::new())
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    async fn page_source(&mut self) -> Result<String, SessionError> {
        self.driver.source().await.map_err(classify_error)
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let session = *self;
        session.driver.quit().await.map_err(classify_error)
    }
}

/// Maps a WebDriver failure onto the session error taxonomy
///
/// Errors whose message shows the browser or its session is gone are fatal for the run.
fn classify_error(error: WebDriverError) -> SessionError {
    let message = error.to_string();
    if is_session_gone(&message) {
        SessionError::Lost(message)
    } else {
        SessionError::Driver(message)
    }
}

fn is_session_gone(message: &str) -> bool {
    let message = message.to_lowercase();
    [
        "invalid session id",
        "session deleted",
        "no such window",
        "chrome not reachable",
        "disconnected",
        "connection refused",
    ]
    .iter()
    .any(|marker| message.contains(marker))
}
