mod common;

use common::{credentials, fast_config, MockBrowser, SharedBrowser};
use std::collections::HashMap;
use std::sync::Arc;
use telco_collector::auth::CodeSource;
use telco_collector::carriers::StrategyRegistry;
use telco_collector::models::{BillingCycle, Carrier, ScraperConfig, ScraperType};
use telco_collector::relay::RelayStore;
use telco_collector::session::SessionManager;

const TELUS_LOGIN_PAGE: &[&str] = &[
    "css:input#username",
    "css:input#password",
    "css:button[data-testid='login-submit']",
];
const TELUS_DASHBOARD: &str = "css:[data-testid='account-overview']";
const TELUS_REPORTS_LINK: &str = "css:a[href*='billing/reports']";
const TELUS_REPORTS_TABLE: &str = "css:[data-testid='reports-table']";
const TELUS_USAGE_DOWNLOAD: &str = "css:a[href*='usage-summary']";
const TELUS_SUBSCRIBER_DOWNLOAD: &str = "css:a[href*='subscriber-detail']";

fn billing_cycle(slug_map: &[(&str, i64)]) -> BillingCycle {
    BillingCycle {
        id: 11,
        carrier: Carrier::Telus,
        label: "2026-07".to_string(),
        slug_map: slug_map
            .iter()
            .map(|(s, id)| (s.to_string(), *id))
            .collect::<HashMap<_, _>>(),
    }
}

async fn logged_in_manager() -> (Arc<MockBrowser>, SessionManager) {
    let config = fast_config();
    let source: Arc<dyn CodeSource> = Arc::new(RelayStore::default());
    let registry = Arc::new(StrategyRegistry::with_code_source(config.clone(), source));
    let browser = MockBrowser::new();
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD]);

    let mut manager = SessionManager::with_browser(
        config,
        registry,
        Box::new(SharedBrowser(browser.clone())),
    );
    let creds = credentials(1, Carrier::Telus);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    (browser, manager)
}

#[tokio::test]
async fn test_execute_downloads_and_maps_files() {
    let (browser, mut manager) = logged_in_manager().await;

    let download_dir = tempfile::tempdir().unwrap();
    browser.set_present(&[TELUS_REPORTS_LINK, TELUS_REPORTS_TABLE, TELUS_USAGE_DOWNLOAD]);
    browser.on_click_write_file(
        TELUS_USAGE_DOWNLOAD,
        download_dir.path().join("usage_summary.csv"),
        b"subscriber,minutes\n",
    );

    let config = ScraperConfig {
        download_dir: download_dir.path().to_path_buf(),
        download_timeout_ms: 2000,
        page_settle_ms: 10,
    };
    let cycle = billing_cycle(&[("usage_summary", 42)]);
    let creds = credentials(1, Carrier::Telus);

    let result = manager.execute(&config, &cycle, &creds).await;

    assert!(result.success, "scrape failed: {:?}", result.error);
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].source_file_name, "usage_summary.csv");
    assert_eq!(result.files[0].mapped_billing_artifact_id, Some(42));
}

#[tokio::test]
async fn test_execute_keeps_unmapped_files_with_null_mapping() {
    let (browser, mut manager) = logged_in_manager().await;

    let download_dir = tempfile::tempdir().unwrap();
    browser.set_present(&[
        TELUS_REPORTS_LINK,
        TELUS_REPORTS_TABLE,
        TELUS_USAGE_DOWNLOAD,
        TELUS_SUBSCRIBER_DOWNLOAD,
    ]);
    browser.on_click_write_file(
        TELUS_USAGE_DOWNLOAD,
        download_dir.path().join("usage_summary.csv"),
        b"a,b\n",
    );
    // nothing in the cycle expects this one
    browser.on_click_write_file(
        TELUS_SUBSCRIBER_DOWNLOAD,
        download_dir.path().join("promo_flyer.pdf"),
        b"%PDF-1.4",
    );

    let config = ScraperConfig {
        download_dir: download_dir.path().to_path_buf(),
        download_timeout_ms: 2000,
        page_settle_ms: 10,
    };
    let cycle = billing_cycle(&[("usage_summary", 42)]);
    let creds = credentials(1, Carrier::Telus);

    let result = manager.execute(&config, &cycle, &creds).await;

    assert!(result.success);
    assert_eq!(result.files.len(), 2);
    let unmapped: Vec<_> = result
        .files
        .iter()
        .filter(|f| f.mapped_billing_artifact_id.is_none())
        .collect();
    assert_eq!(unmapped.len(), 1);
    assert_eq!(unmapped[0].source_file_name, "promo_flyer.pdf");
}

#[tokio::test]
async fn test_execute_reports_missing_section_as_error() {
    let (_browser, mut manager) = logged_in_manager().await;
    // reports link never configured: section cannot be reached

    let download_dir = tempfile::tempdir().unwrap();
    let config = ScraperConfig {
        download_dir: download_dir.path().to_path_buf(),
        download_timeout_ms: 500,
        page_settle_ms: 10,
    };
    let cycle = billing_cycle(&[]);
    let creds = credentials(1, Carrier::Telus);

    let result = manager.execute(&config, &cycle, &creds).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("Reports section"));
    assert!(result.files.is_empty());
    // the failure stays inside the result; the session itself is untouched
    assert!(manager.is_logged_in());
}

#[tokio::test]
async fn test_execute_requires_login() {
    let config = fast_config();
    let source: Arc<dyn CodeSource> = Arc::new(RelayStore::default());
    let registry = Arc::new(StrategyRegistry::with_code_source(config.clone(), source));
    let browser = MockBrowser::new();
    let mut manager = SessionManager::with_browser(
        config,
        registry,
        Box::new(SharedBrowser(browser)),
    );

    let download_dir = tempfile::tempdir().unwrap();
    let scraper_config = ScraperConfig {
        download_dir: download_dir.path().to_path_buf(),
        download_timeout_ms: 500,
        page_settle_ms: 10,
    };
    let cycle = billing_cycle(&[]);
    let creds = credentials(1, Carrier::Telus);

    let result = manager.execute(&scraper_config, &cycle, &creds).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("not logged in"));
}
