use crate::auth::{
    generic_login, generic_logout, probe_logged_in, AuthStrategy, CodeSource, CodeWaiter,
    LinkChallenge, LoginSelectors,
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

const DEFAULT_LOGIN_URL: &str = "https://mb.verizonwireless.com/signin";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#IDToken1"),
        Selector::Css("input[name='IDToken1']"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#IDToken2"),
        Selector::Css("input[name='IDToken2']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button#login-submit"),
        Selector::Css("button[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css("[data-testid='mbt-dashboard']"),
        Selector::Css("a[href*='signout']"),
        Selector::Css(".vz-account-header"),
    ],
    error_banners: &[
        Selector::Css("#errorMessage"),
        Selector::Css("[role='alert']"),
        Selector::Css(".alert-danger"),
    ],
    logout_links: &[
        Selector::Css("a[href*='signout']"),
        Selector::XPath("//a[contains(text(), 'Sign out')]"),
    ],
};

// Verizon confirms new-device logins via a push link, not a typed code.
static LINK_MARKERS: &[Selector<'static>] = &[
    Selector::Css(".device-approval-pending"),
    Selector::XPath("//h1[contains(text(), 'Check your messages')]"),
    Selector::XPath("//p[contains(text(), 'confirmation link')]"),
];

static MONTHLY_REPORT_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='reports/wireless']"),
        Selector::XPath("//a[contains(text(), 'Reports')]"),
    ],
    section_markers: &[
        Selector::Css(".mbt-reports"),
        Selector::Css("table[data-testid='report-list']"),
    ],
    download_links: &[
        Selector::Css("a[href*='account_summary']"),
        Selector::Css("a[href*='usage_detail']"),
        Selector::Css("a[download]"),
    ],
};

static MONTHLY_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("summary", "account_summary"),
    ("usage", "usage_detail"),
];

static PDF_INVOICE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='bill/view']"),
        Selector::XPath("//a[contains(text(), 'View bill')]"),
    ],
    section_markers: &[
        Selector::Css(".bill-overview"),
        Selector::Css("[data-testid='bill-pdf']"),
    ],
    download_links: &[
        Selector::Css("a[href*='billPdf']"),
        Selector::Css("a[href$='.pdf']"),
    ],
};

static PDF_INVOICE_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("bill", "pdf_invoice"),
    ("invoice", "pdf_invoice"),
];

/// Verizon login. The MFA factor is a clickable confirmation link relayed
/// on the `verizon` channel rather than a numeric code.
pub struct VerizonAuth {
    settle: Duration,
    challenge: LinkChallenge,
}

impl VerizonAuth {
    pub fn new(config: &Config, source: Arc<dyn CodeSource>) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
            challenge: LinkChallenge {
                source,
                waiter: CodeWaiter::from_config(config),
                channel: ChannelId::Verizon,
                markers: LINK_MARKERS,
            },
        }
    }
}

#[async_trait]
impl AuthStrategy for VerizonAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Verizon
    }

    fn login_url(&self) -> String {
        std::env::var("VERIZON_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
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
        Carrier::Verizon,
        ScraperType::MonthlyReports,
        &MONTHLY_REPORT_SELECTORS,
        MONTHLY_SLUG_PATTERNS,
    )
}

pub fn pdf_invoice_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Verizon,
        ScraperType::PdfInvoice,
        &PDF_INVOICE_SELECTORS,
        PDF_INVOICE_SLUG_PATTERNS,
    )
}
