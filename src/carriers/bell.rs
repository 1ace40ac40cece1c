use crate::auth::{
    generic_login, generic_logout, probe_logged_in, AuthStrategy, CodeSource, CodeWaiter,
    LoginSelectors, SmsChallenge, TwoFactorSelectors,
};
use crate::browser::{BrowserPort, Selector};
use crate::config::Config;
use crate::errors::ScrapeError;
use crate::models::{Carrier, Credentials, ScraperType};
use crate::relay::ChannelId;
use crate::scrapers::{ReportScraper, ReportSelectors};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LOGIN_URL: &str = "https://mybell.bell.ca/Login";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#USER"),
        Selector::Css("input[name='USER']"),
        Selector::Css("input#bell-username"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#PASSWORD"),
        Selector::Css("input[name='PASSWORD']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button#loginButton"),
        Selector::Css("button[type='submit']"),
        Selector::Css("input[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css("[class*='dashboard']"),
        Selector::Css("a[href*='Logout']"),
        Selector::Css(".account-overview"),
        Selector::Css("#myBellHeader"),
    ],
    error_banners: &[
        Selector::Css(".error-message"),
        Selector::Css(".alert-danger"),
        Selector::Css("[role='alert']"),
        Selector::Css(".login-error"),
    ],
    logout_links: &[
        Selector::Css("a[href*='Logout']"),
        Selector::Css(".logout-btn"),
        Selector::XPath("//a[contains(text(), 'Log out')]"),
    ],
};

static MFA_MARKERS: &[Selector<'static>] = &[
    Selector::Css("input[autocomplete='one-time-code']"),
    Selector::Css("#securityCode"),
    Selector::Css("input[name='securityCode']"),
    Selector::XPath("//h1[contains(text(), 'verification code')]"),
];

static MFA_SELECTORS: TwoFactorSelectors = TwoFactorSelectors {
    code_inputs: &[
        Selector::Css("input[autocomplete='one-time-code']"),
        Selector::Css("#securityCode"),
        Selector::Css("input[name='securityCode']"),
        Selector::Css("input[inputmode='numeric']"),
    ],
    submit_buttons: &[
        Selector::Css("button#submitSecurityCode"),
        Selector::Css("button[type='submit']"),
    ],
};

static MONTHLY_REPORT_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='BillingReports']"),
        Selector::Css("a[href*='reports']"),
        Selector::XPath("//a[contains(text(), 'Reports')]"),
    ],
    section_markers: &[
        Selector::Css(".reports-list"),
        Selector::Css("[data-section='billing-reports']"),
        Selector::Css("table.report-table"),
    ],
    download_links: &[
        Selector::Css("a[href*='UsageOverview']"),
        Selector::Css("a[href*='DeviceDetail']"),
        Selector::Css("a[href*='ChargesSummary']"),
        Selector::Css("a[download][href*='report']"),
    ],
};

static MONTHLY_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("usage", "usage_overview"),
    ("device", "device_detail"),
    ("charges", "charges_summary"),
];

static DAILY_USAGE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='DailyUsage']"),
        Selector::XPath("//a[contains(text(), 'Daily usage')]"),
    ],
    section_markers: &[
        Selector::Css(".usage-table"),
        Selector::Css("[data-section='daily-usage']"),
    ],
    download_links: &[
        Selector::Css("a[href*='ExportUsage']"),
        Selector::Css("button.export-csv"),
    ],
};

static DAILY_USAGE_SLUG_PATTERNS: &[(&str, &str)] = &[("usage", "daily_usage")];

static PDF_INVOICE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='ViewBill']"),
        Selector::XPath("//a[contains(text(), 'View my bill')]"),
    ],
    section_markers: &[
        Selector::Css(".bill-summary"),
        Selector::Css("[data-section='bill']"),
    ],
    download_links: &[
        Selector::Css("a[href*='DownloadBill']"),
        Selector::Css("a[href$='.pdf']"),
    ],
};

static PDF_INVOICE_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("bill", "pdf_invoice"),
    ("invoice", "pdf_invoice"),
];

/// Bell login. SMS codes for this account arrive on the relay's legacy
/// root channel.
pub struct BellAuth {
    settle: Duration,
    challenge: SmsChallenge,
}

impl BellAuth {
    pub fn new(config: &Config, source: Arc<dyn CodeSource>) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
            challenge: SmsChallenge {
                source,
                waiter: CodeWaiter::from_config(config),
                channel: ChannelId::Root,
                markers: MFA_MARKERS,
                selectors: &MFA_SELECTORS,
            },
        }
    }
}

#[async_trait]
impl AuthStrategy for BellAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Bell
    }

    fn login_url(&self) -> String {
        std::env::var("BELL_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
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

        self.challenge.clear_if_present(browser, self.settle).await?;

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
        Carrier::Bell,
        ScraperType::MonthlyReports,
        &MONTHLY_REPORT_SELECTORS,
        MONTHLY_SLUG_PATTERNS,
    )
}

pub fn daily_usage_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Bell,
        ScraperType::DailyUsage,
        &DAILY_USAGE_SELECTORS,
        DAILY_USAGE_SLUG_PATTERNS,
    )
}

pub fn pdf_invoice_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Bell,
        ScraperType::PdfInvoice,
        &PDF_INVOICE_SELECTORS,
        PDF_INVOICE_SLUG_PATTERNS,
    )
}
