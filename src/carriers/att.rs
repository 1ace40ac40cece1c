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

const DEFAULT_LOGIN_URL: &str = "https://www.att.com/my/#/login";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#userID"),
        Selector::Css("input[name='userid']"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#password"),
        Selector::Css("input[name='password']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button#signin"),
        Selector::Css("button[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css("[data-testid='account-dashboard']"),
        Selector::Css("a[href*='signout']"),
        Selector::Css(".myatt-nav"),
    ],
    error_banners: &[
        Selector::Css("#errorMsg"),
        Selector::Css("[role='alert']"),
        Selector::Css(".alert-danger"),
    ],
    logout_links: &[
        Selector::Css("a[href*='signout']"),
        Selector::XPath("//a[contains(text(), 'Sign out')]"),
    ],
};

static MFA_MARKERS: &[Selector<'static>] = &[
    Selector::Css("input#verificationCode"),
    Selector::Css("input[autocomplete='one-time-code']"),
    Selector::XPath("//h1[contains(text(), 'Enter your code')]"),
];

static MFA_SELECTORS: TwoFactorSelectors = TwoFactorSelectors {
    code_inputs: &[
        Selector::Css("input#verificationCode"),
        Selector::Css("input[autocomplete='one-time-code']"),
        Selector::Css("input[inputmode='numeric']"),
    ],
    submit_buttons: &[
        Selector::Css("button#submitCode"),
        Selector::Css("button[type='submit']"),
    ],
};

static DAILY_USAGE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='usage/daily']"),
        Selector::XPath("//a[contains(text(), 'Daily usage')]"),
    ],
    section_markers: &[
        Selector::Css(".usage-details"),
        Selector::Css("[data-testid='usage-table']"),
    ],
    download_links: &[
        Selector::Css("a[href*='downloadUsage']"),
        Selector::Css("button.export-usage"),
    ],
};

static DAILY_USAGE_SLUG_PATTERNS: &[(&str, &str)] = &[("usage", "daily_usage")];

static MONTHLY_REPORT_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='billing/reports']"),
        Selector::XPath("//a[contains(text(), 'Reports')]"),
    ],
    section_markers: &[
        Selector::Css(".premier-reports"),
        Selector::Css("table.reports"),
    ],
    download_links: &[
        Selector::Css("a[href*='usage_overview']"),
        Selector::Css("a[href*='wireless_detail']"),
        Selector::Css("a[download]"),
    ],
};

static MONTHLY_SLUG_PATTERNS: &[(&str, &str)] = &[
    ("usage", "usage_overview"),
    ("wireless", "wireless_detail"),
];

/// AT&T login with an SMS challenge; codes arrive on the relay's `att`
/// channel.
pub struct AttAuth {
    settle: Duration,
    challenge: SmsChallenge,
}

impl AttAuth {
    pub fn new(config: &Config, source: Arc<dyn CodeSource>) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
            challenge: SmsChallenge {
                source,
                waiter: CodeWaiter::from_config(config),
                channel: ChannelId::Att,
                markers: MFA_MARKERS,
                selectors: &MFA_SELECTORS,
            },
        }
    }
}

#[async_trait]
impl AuthStrategy for AttAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Att
    }

    fn login_url(&self) -> String {
        std::env::var("ATT_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
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

pub fn daily_usage_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Att,
        ScraperType::DailyUsage,
        &DAILY_USAGE_SELECTORS,
        DAILY_USAGE_SLUG_PATTERNS,
    )
}

pub fn monthly_reports_scraper() -> ReportScraper {
    ReportScraper::new(
        Carrier::Att,
        ScraperType::MonthlyReports,
        &MONTHLY_REPORT_SELECTORS,
        MONTHLY_SLUG_PATTERNS,
    )
}
