use crate::browser::{try_click, wait_any_present, BrowserPort, Selector};
use crate::errors::ScrapeError;
use crate::models::{BillingCycle, Carrier, FileDownloadInfo, ScraperConfig, ScraperType};
use crate::scrapers::files::map_downloads;
use crate::scrapers::ScraperStrategy;
use async_trait::async_trait;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Selector catalog for one carrier's reporting section. `download_links`
/// lists one anchor per report artifact the portal offers; each present
/// link is clicked once.
pub struct ReportSelectors {
    pub section_links: &'static [Selector<'static>],
    pub section_markers: &'static [Selector<'static>],
    pub download_links: &'static [Selector<'static>],
}

pub async fn open_reports_section(
    browser: &dyn BrowserPort,
    selectors: &ReportSelectors,
    settle: Duration,
) -> Result<(), ScrapeError> {
    tracing::info!("🔍 Navigating to reports section...");

    if !try_click(browser, selectors.section_links).await {
        return Err(ScrapeError::Download(
            "Reports section link not found".to_string(),
        ));
    }
    tokio::time::sleep(settle).await;

    if !wait_any_present(browser, selectors.section_markers, Duration::from_secs(15)).await {
        return Err(ScrapeError::Download(
            "Reports section did not load".to_string(),
        ));
    }

    tracing::info!("✅ Reports section open");
    Ok(())
}

fn snapshot_dir(dir: &Path) -> Result<HashSet<OsString>, ScrapeError> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        names.insert(entry?.file_name());
    }
    Ok(names)
}

fn is_partial_download(name: &str) -> bool {
    name.ends_with(".crdownload") || name.ends_with(".part") || name.ends_with(".tmp")
}

/// Watches the browser download directory for a file that was not there
/// before the click and has finished writing.
pub async fn wait_for_new_file(
    dir: &Path,
    before: &HashSet<OsString>,
    timeout: Duration,
) -> Result<Option<PathBuf>, ScrapeError> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if before.contains(&name) {
                continue;
            }
            if let Some(name_str) = name.to_str() {
                if is_partial_download(name_str) {
                    continue;
                }
                // give the browser a beat to release the handle
                tokio::time::sleep(Duration::from_millis(200)).await;
                return Ok(Some(dir.join(name_str)));
            }
        }

        if tokio::time::Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

pub async fn download_visible_reports(
    browser: &dyn BrowserPort,
    selectors: &ReportSelectors,
    config: &ScraperConfig,
) -> Result<Vec<PathBuf>, ScrapeError> {
    std::fs::create_dir_all(&config.download_dir)?;
    let timeout = Duration::from_millis(config.download_timeout_ms);
    let mut downloaded = Vec::new();

    for link in selectors.download_links {
        if !browser.exists(link).await {
            tracing::debug!("  ✗ download link absent: {}", link);
            continue;
        }

        let before = snapshot_dir(&config.download_dir)?;
        if let Err(e) = browser.click(link).await {
            tracing::warn!("⚠️ Download click failed ({}): {}", link, e);
            continue;
        }

        match wait_for_new_file(&config.download_dir, &before, timeout).await? {
            Some(path) => {
                tracing::info!("⬇️ Downloaded: {}", path.display());
                downloaded.push(path);
            }
            None => {
                tracing::warn!("⚠️ Download did not materialize for {}", link);
            }
        }
    }

    if downloaded.is_empty() {
        return Err(ScrapeError::Download(
            "No report files could be downloaded".to_string(),
        ));
    }

    Ok(downloaded)
}

/// Shared scraper implementation: every carrier's report flow is the same
/// shape (open section, click downloads, map files); only the selector
/// catalog and slug patterns differ.
pub struct ReportScraper {
    carrier: Carrier,
    scraper_type: ScraperType,
    selectors: &'static ReportSelectors,
    slug_patterns: &'static [(&'static str, &'static str)],
}

impl ReportScraper {
    pub fn new(
        carrier: Carrier,
        scraper_type: ScraperType,
        selectors: &'static ReportSelectors,
        slug_patterns: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self {
            carrier,
            scraper_type,
            selectors,
            slug_patterns,
        }
    }
}

#[async_trait]
impl ScraperStrategy for ReportScraper {
    fn carrier(&self) -> Carrier {
        self.carrier
    }

    fn scraper_type(&self) -> ScraperType {
        self.scraper_type
    }

    async fn find_files_section(
        &self,
        browser: &dyn BrowserPort,
        config: &ScraperConfig,
    ) -> Result<(), ScrapeError> {
        open_reports_section(
            browser,
            self.selectors,
            Duration::from_millis(config.page_settle_ms),
        )
        .await
    }

    async fn download_files(
        &self,
        browser: &dyn BrowserPort,
        config: &ScraperConfig,
        billing_cycle: &BillingCycle,
    ) -> Result<Vec<FileDownloadInfo>, ScrapeError> {
        let paths = download_visible_reports(browser, self.selectors, config).await?;
        map_downloads(&paths, billing_cycle, self.slug_patterns)
    }
}
