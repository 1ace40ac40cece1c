use crate::auth::{
    generic_login, generic_logout, probe_logged_in, AuthStrategy, LoginSelectors,
};
use crate::browser::{BrowserPort, Selector};
use crate::config::Config;
use crate::errors::ScrapeError;
use crate::models::{Carrier, Credentials, ScraperType};
use crate::scrapers::{ReportScraper, ReportSelectors};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_LOGIN_URL: &str = "https://www.telus.com/my-telus/login";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#username"),
        Selector::Css("input[name='username']"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#password"),
        Selector::Css("input[name='password']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button[data-testid='login-submit']"),
        Selector::Css("button[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css("[data-testid='account-overview']"),
        Selector::Css("a[href*='logout']"),
        Selector::Css(".my-telus-nav"),
    ],
    error_banners: &[
        Selector::Css("[role='alert']"),
        Selector::Css(".error-message"),
        Selector::Css(".alert-danger"),
    ],
    logout_links: &[
        Selector::Css("a[href*='logout']"),
        Selector::XPath("//a[contains(text(), 'Log out')]"),
    ],
};

static MONTHLY_REPORT_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='billing/reports']"),
        Selector::XPath("//a[contains(text(), 'Usage reports')]"),
    ],
    section_markers: &[
        Selector::Css("[data-testid='reports-table']"),
        Selector::Css(".reports-list"),
    ],
    download_links: &[
        Selector::Css("a[href*='usage-summary']"),
        Selector::Css("a[href*='subscriber-detail']"),
        Selector::Css("a[download]"),
    ],
};

static MONTHLY_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("summary", "usage_summary"),
    ("subscriber", "subscriber_detail"),
];

/// Telus login; this portal does not challenge automation-friendly
/// accounts with a second factor.
pub struct TelusAuth {
    settle: Duration,
}

impl TelusAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
        }
    }
}

#[async_trait]
impl AuthStrategy for TelusAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Telus
    }

    fn login_url(&self) -> String {
        std::env::var("TELUS_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
    }

    async fn login(
        &self,
        browser: &dyn BrowserPort,
        credentials: &Credentials,
    ) -> Result<bool, ScrapeError> {
        generic_login(
            browser,
            &LOGIN_SELECTORS,
            &self.login_url(),
            credentials,
            self.settle,
        )
        .await?;

        Ok(probe_logged_in(browser, LOGIN_SELECTORS.logged_in_indicators).await)
    }

    async fn logout(&self, browser: &dyn BrowserPort) -> Result<bool, ScrapeError> {
        generic_logout(browser, &LOGIN_SELECTORS, self.settle).await
    }

    async fn is_logged_in(&self, browser: &dyn BrowserPort) -> bool {
        probe_logged_in(browser, LOGIN_SELECTORS.logged_in_indicators).await
    }
}

pub fn monthly_reports_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Telus,
        ScraperType::MonthlyReports,
        &MONTHLY_REPORT_SELECTORS,
        MONTHLY_SLUG_PATTERNS,
    )
}
