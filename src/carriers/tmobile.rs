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

const DEFAULT_LOGIN_URL: &str = "https://account.t-mobile.com/signin";

static LOGIN_SELECTORS: LoginSelectors = LoginSelectors {
    username_inputs: &[
        Selector::Css("input#usernameTextBox"),
        Selector::Css("input[name='username']"),
        Selector::Css("input[type='email']"),
    ],
    password_inputs: &[
        Selector::Css("input#passwordTextBox"),
        Selector::Css("input[name='password']"),
        Selector::Css("input[type='password']"),
    ],
    submit_buttons: &[
        Selector::Css("button#lp1-next-btn"),
        Selector::Css("button[type='submit']"),
    ],
    logged_in_indicators: &[
        Selector::Css("[data-testid='home-dashboard']"),
        Selector::Css("a[href*='logout']"),
        Selector::Css(".tmo-account-nav"),
    ],
    error_banners: &[
        Selector::Css(".error-text"),
        Selector::Css("[role='alert']"),
        Selector::Css(".alert-danger"),
    ],
    logout_links: &[
        Selector::Css("a[href*='logout']"),
        Selector::XPath("//a[contains(text(), 'Log out')]"),
    ],
};

static MFA_MARKERS: &[Selector<'static>] = &[
    Selector::Css("input#otpInput"),
    Selector::Css("input[autocomplete='one-time-code']"),
    Selector::XPath("//h1[contains(text(), 'verify')]"),
];

static MFA_SELECTORS: TwoFactorSelectors = TwoFactorSelectors {
    code_inputs: &[
        Selector::Css("input#otpInput"),
        Selector::Css("input[autocomplete='one-time-code']"),
        Selector::Css("input[inputmode='numeric']"),
    ],
    submit_buttons: &[
        Selector::Css("button#otpSubmit"),
        Selector::Css("button[type='submit']"),
    ],
};

static DAILY_USAGE_SELECTORS: ReportSelectors = ReportSelectors {
    section_links: &[
        Selector::Css("a[href*='usage-details']"),
        Selector::XPath("//a[contains(text(), 'Usage details')]"),
    ],
    section_markers: &[
        Selector::Css(".usage-summary"),
        Selector::Css("[data-testid='usage-details']"),
    ],
    download_links: &[
        Selector::Css("a[href*='download-usage']"),
        Selector::Css("button.usage-export"),
    ],
};

static DAILY_USAGE_SLUG_PATTERNS: &[(&str, &str)] = &[("usage", "daily_usage")];

/// T-Mobile login with an SMS challenge on the `tmobile` relay channel.
pub struct TmobileAuth {
    settle: Duration,
    challenge: SmsChallenge,
}

impl TmobileAuth {
    pub fn new(config: &Config, source: Arc<dyn CodeSource>) -> Self {
        Self {
            settle: Duration::from_millis(config.page_settle_ms),
            challenge: SmsChallenge {
                source,
                waiter: CodeWaiter::from_config(config),
                channel: ChannelId::Tmobile,
                markers: MFA_MARKERS,
                selectors: &MFA_SELECTORS,
            },
        }
    }
}

#[async_trait]
impl AuthStrategy for TmobileAuth {
    fn carrier(&self) -> Carrier {
        Carrier::Tmobile
    }

    fn login_url(&self) -> String {
        std::env::var("TMOBILE_LOGIN_URL").unwrap_or_else(|_| DEFAULT_LOGIN_URL.to_string())
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
        Carrier::Tmobile,
        ScraperType::DailyUsage,
        &DAILY_USAGE_SELECTORS,
        DAILY_USAGE_SLUG_PATTERNS,
    )
}
