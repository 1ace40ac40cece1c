pub mod files;
pub mod reports;

use crate::browser::BrowserPort;
use crate::errors::ScrapeError;
use crate::models::{
    BillingCycle, Carrier, Credentials, FileDownloadInfo, ScraperConfig, ScraperResult, ScraperType,
};
use async_trait::async_trait;
use std::time::Instant;
use uuid::Uuid;

pub use reports::{ReportScraper, ReportSelectors};

/// Per-(carrier, scraper type) download procedure. Runs against a session
/// the session manager has already authenticated.
#[async_trait]
pub trait ScraperStrategy: Send + Sync {
    fn carrier(&self) -> Carrier;

    fn scraper_type(&self) -> ScraperType;

    /// Navigates from the landing page into the reporting section.
    async fn find_files_section(
        &self,
        browser: &dyn BrowserPort,
        config: &ScraperConfig,
    ) -> Result<(), ScrapeError>;

    /// Downloads everything the section offers and maps each file against
    /// the billing cycle's slug table.
    async fn download_files(
        &self,
        browser: &dyn BrowserPort,
        config: &ScraperConfig,
        billing_cycle: &BillingCycle,
    ) -> Result<Vec<FileDownloadInfo>, ScrapeError>;

    /// Full run. Total: failures land in `ScraperResult.error`, they do not
    /// escape into the job loop.
    async fn execute(
        &self,
        browser: &dyn BrowserPort,
        config: &ScraperConfig,
        billing_cycle: &BillingCycle,
        _credentials: &Credentials,
    ) -> ScraperResult {
        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();

        tracing::info!(
            "🚀 Scrape started: {} / {} (cycle {})",
            self.carrier(),
            self.scraper_type(),
            billing_cycle.label
        );

        if let Err(e) = self.find_files_section(browser, config).await {
            tracing::error!("❌ {} - reports section not reached: {}", self.carrier(), e);
            return ScraperResult::failed(
                request_id,
                e.to_string(),
                start.elapsed().as_millis() as u64,
            );
        }

        match self.download_files(browser, config, billing_cycle).await {
            Ok(files) => {
                let mapped = files
                    .iter()
                    .filter(|f| f.mapped_billing_artifact_id.is_some())
                    .count();
                tracing::info!(
                    "✅ {} - {} files downloaded, {} mapped",
                    self.carrier(),
                    files.len(),
                    mapped
                );
                ScraperResult {
                    request_id,
                    success: true,
                    files,
                    error: None,
                    scrape_ms: start.elapsed().as_millis() as u64,
                }
            }
            Err(e) => {
                tracing::error!("❌ {} - download failed: {}", self.carrier(), e);
                ScraperResult::failed(
                    request_id,
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }
}
