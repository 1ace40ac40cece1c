//! Shared test doubles for session and scraper integration tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use telco_collector::browser::{BrowserPort, Selector};
use telco_collector::config::Config;
use telco_collector::errors::ScrapeError;
use telco_collector::models::{Carrier, Credentials};

/// Scripted browser: tests declare which selectors exist on the "page",
/// what text they carry, and which clicks drop a file into the download
/// directory. Every interaction is recorded.
#[derive(Default)]
pub struct MockBrowser {
    present: Mutex<HashSet<String>>,
    texts: Mutex<HashMap<String, String>>,
    click_files: Mutex<HashMap<String, (PathBuf, &'static [u8])>>,
    pub navigations: Mutex<Vec<String>>,
    pub filled: Mutex<Vec<(String, String)>>,
    pub clicked: Mutex<Vec<String>>,
}

impl MockBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(selector: &Selector<'_>) -> String {
        selector.to_string()
    }

    pub fn set_present(&self, selectors: &[&str]) {
        let mut present = self.present.lock().unwrap();
        for s in selectors {
            present.insert(s.to_string());
        }
    }

    pub fn remove_present(&self, selectors: &[&str]) {
        let mut present = self.present.lock().unwrap();
        for s in selectors {
            present.remove(*s);
        }
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.texts
            .lock()
            .unwrap()
            .insert(selector.to_string(), text.to_string());
    }

    /// When `selector` is clicked, write `content` to `path` - simulates
    /// the browser dropping a download into the download directory.
    pub fn on_click_write_file(&self, selector: &str, path: PathBuf, content: &'static [u8]) {
        self.click_files
            .lock()
            .unwrap()
            .insert(selector.to_string(), (path, content));
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.lock().unwrap().len()
    }

    pub fn was_filled_with(&self, selector: &str, value: &str) -> bool {
        self.filled
            .lock()
            .unwrap()
            .iter()
            .any(|(s, v)| s == selector && v == value)
    }
}

#[async_trait]
impl BrowserPort for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        self.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self
            .navigations
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn exists(&self, selector: &Selector<'_>) -> bool {
        self.present.lock().unwrap().contains(&Self::key(selector))
    }

    async fn fill(&self, selector: &Selector<'_>, value: &str) -> Result<(), ScrapeError> {
        self.filled
            .lock()
            .unwrap()
            .push((Self::key(selector), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &Selector<'_>) -> Result<(), ScrapeError> {
        let key = Self::key(selector);
        self.clicked.lock().unwrap().push(key.clone());
        if let Some((path, content)) = self.click_files.lock().unwrap().get(&key) {
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    async fn text(&self, selector: &Selector<'_>) -> Result<String, ScrapeError> {
        self.texts
            .lock()
            .unwrap()
            .get(&Self::key(selector))
            .cloned()
            .ok_or_else(|| ScrapeError::WebDriver("element has no text".to_string()))
    }

    async fn clear_storage(&self) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// Forwarding wrapper so a test can keep an `Arc<MockBrowser>` for
/// assertions while the session manager owns the boxed port.
pub struct SharedBrowser(pub Arc<MockBrowser>);

#[async_trait]
impl BrowserPort for SharedBrowser {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        self.0.navigate(url).await
    }
    async fn current_url(&self) -> Result<String, ScrapeError> {
        self.0.current_url().await
    }
    async fn exists(&self, selector: &Selector<'_>) -> bool {
        self.0.exists(selector).await
    }
    async fn fill(&self, selector: &Selector<'_>, value: &str) -> Result<(), ScrapeError> {
        self.0.fill(selector, value).await
    }
    async fn click(&self, selector: &Selector<'_>) -> Result<(), ScrapeError> {
        self.0.click(selector).await
    }
    async fn text(&self, selector: &Selector<'_>) -> Result<String, ScrapeError> {
        self.0.text(selector).await
    }
    async fn clear_storage(&self) -> Result<(), ScrapeError> {
        self.0.clear_storage().await
    }
    async fn close(&self) -> Result<(), ScrapeError> {
        self.0.close().await
    }
}

/// Config with timings shrunk so tests do not sit in settle sleeps.
pub fn fast_config() -> Arc<Config> {
    let mut config = Config::from_env().expect("config");
    config.page_settle_ms = 10;
    config.twofa_poll_interval_ms = 20;
    config.twofa_wait_timeout_ms = 500;
    config.download_timeout_ms = 2000;
    Arc::new(config)
}

pub fn credentials(id: i64, carrier: Carrier) -> Credentials {
    Credentials {
        id,
        username: format!("billing-{}@example.com", carrier),
        password: "correct horse".to_string(),
        carrier,
    }
}
