use crate::auth::{
    generic_login, generic_logout, probe_logged_in, AuthStrategy, LoginSelectors,
};
use crate::browser::{try_click, BrowserPort, Selector};
use crate::config::Config;
use crate::errors::ScrapeError;
use crate::models::{Carrier, Credentials, ScraperType};
use crate::scrapers::{ReportScraper, ReportSelectors};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_LOGIN_URL: &str = "https://www.rogers.com/business/signin";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#signInUsername"),
        Selector::Css("input[name='username']"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#signInPassword"),
        Selector::Css("input[name='password']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button#signInButton"),
        Selector::Css("button[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css(".account-dashboard"),
        Selector::Css("a[href*='sign-out']"),
        Selector::Css("[data-testid='business-nav']"),
    ],
    error_banners: &[
        Selector::Css(".sign-in-error"),
        Selector::Css("[role='alert']"),
        Selector::Css(".alert-danger"),
    ],
    logout_links: &[
        Selector::Css("a[href*='sign-out']"),
        Selector::XPath("//a[contains(text(), 'Sign out')]"),
    ],
};

// Interstitial the portal sometimes shows before the dashboard.
static CONTINUE_BUTTONS: &[Selector<'static>] = &[
    Selector::Css("button#continueButton"),
    Selector::XPath("//button[contains(text(), 'Continue to my account')]"),
];

static MONTHLY_REPORT_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='billing-reports']"),
        Selector::XPath("//a[contains(text(), 'Billing reports')]"),
    ],
    section_markers: &[
        Selector::Css(".reports-container"),
        Selector::Css("table[data-testid='reports']"),
    ],
    download_links: &[
        Selector::Css("a[href*='wireless-usage']"),
        Selector::Css("a[href*='hardware-summary']"),
        Selector::Css("a[download]"),
    ],
};

static MONTHLY_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("wireless", "wireless_usage"),
    ("hardware", "hardware_summary"),
];

static DAILY_USAGE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='daily-usage']"),
        Selector::XPath("//a[contains(text(), 'Daily usage')]"),
    ],
    section_markers: &[Selector::Css(".usage-export"), Selector::Css(".usage-table")],
    download_links: &[
        Selector::Css("a[href*='export']"),
        Selector::Css("button.download-usage"),
    ],
};

static DAILY_USAGE_SLUG_PATTERNS: &[(&str, &str)] = &[("usage", "daily_usage")];

pub struct RogersAuth {
    settle: Duration,
}

impl RogersAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
        }
    }
}

#[async_trait]
impl AuthStrategy for RogersAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Rogers
    }

    fn login_url(&self) -> String {
        std::env::var("ROGERS_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
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

        // dismiss the post-login interstitial when it appears
        if try_click(browser, CONTINUE_BUTTONS).await {
            tracing::info!("✅ Interstitial dismissed");
            tokio::time::sleep(self.settle).await;
        }

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
        Carrier::Rogers,
        ScraperType::MonthlyReports,
        &MONTHLY_REPORT_SELECTORS,
        MONTHLY_SLUG_PATTERNS,
    )
}

pub fn daily_usage_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Rogers,
        ScraperType::DailyUsage,
        &DAILY_USAGE_SELECTORS,
        DAILY_USAGE_SLUG_PATTERNS,
    )
}
