//! Browser automation capability.
//!
//! The run never talks to a concrete browser directly. Everything it needs is
//! expressed by [`BrowserSession`]: locate elements by [`Selector`], read and
//! set their values, click, report page text and open/close an isolated
//! viewing context. Bounded waits are provided on top of those primitives so
//! every implementation gets the same timeout semantics.

pub mod error;
#[cfg(test)]
pub mod fake;
pub mod webdriver;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};

pub use error::BrowserError;
pub use webdriver::{WebDriverClient, WebDriverOptions};

/// Interval between polls of a bounded wait.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
    LinkText(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Selector::LinkText(value.into())
    }

    /// W3C WebDriver locator strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Selector::Css(_) => "css selector",
            Selector::XPath(_) => "xpath",
            Selector::LinkText(_) => "link text",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Selector::Css(v) | Selector::XPath(v) | Selector::LinkText(v) => v,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.strategy(), self.value())
    }
}

/// Opaque reference to an element located in the current context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// A browser cookie in WebDriver's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

/// Operations the run issues against an automated browser.
///
/// Implementations report "not found" through [`BrowserError::is_missing`]
/// errors or empty results; the provided wait helpers poll until their
/// condition holds or the timeout expires.
pub trait BrowserSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    async fn refresh(&self) -> Result<(), BrowserError>;

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>, BrowserError>;

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError>;

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, BrowserError>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, BrowserError>;

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, BrowserError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn clear(&self, element: &ElementHandle) -> Result<(), BrowserError>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError>;

    /// Visible text of the whole current page.
    async fn page_text(&self) -> Result<String, BrowserError>;

    /// Opens `url` in a fresh tab and makes it the current context. On
    /// failure the previous context stays current.
    async fn open_context(&self, url: &str) -> Result<(), BrowserError>;

    /// Closes the current tab and returns to the context it was opened from.
    /// The return happens even when closing the tab fails.
    async fn close_context(&self) -> Result<(), BrowserError>;

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError>;

    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError>;

    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), BrowserError>;

    async fn find_first(&self, selector: &Selector) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// Trimmed text of the first match, `None` when absent, empty or unreadable.
    async fn find_text(&self, selector: &Selector) -> Option<String> {
        let element = match self.find_first(selector).await {
            Ok(Some(element)) => element,
            Ok(None) => return None,
            Err(err) => {
                tracing::debug!(%selector, error = %err, "lookup failed");
                return None;
            }
        };
        match self.text(&element).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(err) => {
                tracing::debug!(%selector, error = %err, "text read failed");
                None
            }
        }
    }

    async fn is_interactable(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        Ok(self.is_displayed(element).await? && self.is_enabled(element).await?)
    }

    async fn wait_for_present(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_first(selector).await {
                Ok(Some(element)) => return Ok(element),
                Ok(None) => {}
                Err(err) if err.is_missing() => {}
                Err(err) => return Err(err),
            }
            if !poll_until(deadline).await {
                return Err(BrowserError::timeout(selector.to_string(), timeout));
            }
        }
    }

    /// Waits for a displayed, enabled match.
    async fn wait_for_clickable(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_all(selector).await {
                Ok(elements) => {
                    for element in elements {
                        match self.is_interactable(&element).await {
                            Ok(true) => return Ok(element),
                            Ok(false) => {}
                            Err(err) if err.is_missing() => {}
                            Err(err) => return Err(err),
                        }
                    }
                }
                Err(err) if err.is_missing() => {}
                Err(err) => return Err(err),
            }
            if !poll_until(deadline).await {
                return Err(BrowserError::timeout(
                    format!("clickable {selector}"),
                    timeout,
                ));
            }
        }
    }

    /// Waits until no displayed element matches.
    async fn wait_until_absent(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            let mut visible = false;
            match self.find_all(selector).await {
                Ok(elements) => {
                    for element in elements {
                        if self.is_displayed(&element).await.unwrap_or(false) {
                            visible = true;
                            break;
                        }
                    }
                }
                Err(err) if err.is_missing() => {}
                Err(err) => return Err(err),
            }
            if !visible {
                return Ok(());
            }
            if !poll_until(deadline).await {
                return Err(BrowserError::timeout(
                    format!("{selector} to disappear"),
                    timeout,
                ));
            }
        }
    }

    /// Waits for any of `phrases` (case-insensitive) to appear in the page
    /// text more often than it did in `baseline`, and returns that phrase.
    async fn wait_for_new_text(
        &self,
        phrases: &[String],
        baseline: &str,
        timeout: Duration,
    ) -> Result<String, BrowserError> {
        let baseline = baseline.to_lowercase();
        let deadline = Instant::now() + timeout;
        loop {
            match self.page_text().await {
                Ok(text) => {
                    let text = text.to_lowercase();
                    let hit = phrases.iter().find(|p| {
                        let phrase = p.to_lowercase();
                        text.matches(&phrase).count() > baseline.matches(&phrase).count()
                    });
                    if let Some(hit) = hit {
                        return Ok(hit.clone());
                    }
                }
                Err(err) if err.is_missing() => {}
                Err(err) => return Err(err),
            }
            if !poll_until(deadline).await {
                return Err(BrowserError::timeout(
                    format!("any of {phrases:?}"),
                    timeout,
                ));
            }
        }
    }
}

/// Sleeps one poll interval (capped at the deadline). Returns false once the
/// deadline has passed.
async fn poll_until(deadline: Instant) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    sleep(POLL_INTERVAL.min(deadline - now)).await;
    true
}
