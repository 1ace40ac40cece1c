use crate::errors::ScrapeError;
use async_trait::async_trait;
use std::time::Duration;

/// CSS or XPath locator. Carrier modules keep these in static catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    Css(&'a str),
    XPath(&'a str),
}

impl std::fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{}", s),
            Selector::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// Narrow capability interface over the browser automation driver.
/// Auth and scraper strategies only ever see this trait, never the
/// underlying WebDriver client.
#[async_trait]
pub trait BrowserPort: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError>;

    async fn current_url(&self) -> Result<String, ScrapeError>;

    async fn exists(&self, selector: &Selector<'_>) -> bool;

    async fn fill(&self, selector: &Selector<'_>, value: &str) -> Result<(), ScrapeError>;

    async fn click(&self, selector: &Selector<'_>) -> Result<(), ScrapeError>;

    async fn text(&self, selector: &Selector<'_>) -> Result<String, ScrapeError>;

    /// Clears cookies plus local/session storage. Used by the stale-session
    /// recovery path.
    async fn clear_storage(&self) -> Result<(), ScrapeError>;

    async fn close(&self) -> Result<(), ScrapeError>;
}

/// Tries each selector in order, fills the first one present.
pub async fn try_fill(
    browser: &dyn BrowserPort,
    selectors: &[Selector<'_>],
    value: &str,
) -> bool {
    for selector in selectors {
        tracing::debug!("  → trying: {}", selector);
        if browser.exists(selector).await {
            tracing::debug!("  ✅ element found: {}", selector);
            if browser.fill(selector, value).await.is_ok() {
                return true;
            }
        }
    }
    false
}

/// Tries each selector in order, clicks the first one present.
pub async fn try_click(browser: &dyn BrowserPort, selectors: &[Selector<'_>]) -> bool {
    for selector in selectors {
        tracing::debug!("  → trying: {}", selector);
        if browser.exists(selector).await {
            tracing::debug!("  ✅ element found: {}", selector);
            if browser.click(selector).await.is_ok() {
                return true;
            }
        }
    }
    false
}

pub async fn any_present(browser: &dyn BrowserPort, selectors: &[Selector<'_>]) -> bool {
    for selector in selectors {
        if browser.exists(selector).await {
            return true;
        }
    }
    false
}

/// Polls until one of the selectors shows up or the timeout elapses.
pub async fn wait_any_present(
    browser: &dyn BrowserPort,
    selectors: &[Selector<'_>],
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if any_present(browser, selectors).await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
