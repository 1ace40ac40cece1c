use crate::auth::AuthStrategy;
use crate::browser::{BrowserPort, FantocciniBrowser};
use crate::carriers::StrategyRegistry;
use crate::config::Config;
use crate::errors::ScrapeError;
use crate::models::{
    BillingCycle, Carrier, Credentials, ScraperConfig, ScraperResult, ScraperType, SessionState,
    SessionStatus,
};
use crate::scrapers::ScraperStrategy;
use crate::utils::mask_sensitive;
use std::sync::Arc;
use uuid::Uuid;

/// Owns one authenticated browser session at a time and tracks it through
/// the LOGGED_OUT / LOGGED_IN / ERROR state machine. One logical sequence
/// of operations drives a manager; parallel jobs get their own instances.
///
/// Every state-changing method is total - failures are captured into the
/// ERROR state with a message. The single exception is an unbound
/// (carrier, scraper type) pair, which is a caller-configuration fault and
/// propagates as `ScrapeError::NoStrategy`.
pub struct SessionManager {
    config: Arc<Config>,
    registry: Arc<StrategyRegistry>,
    state: SessionState,
    browser: Option<Box<dyn BrowserPort>>,
    strategy: Option<Arc<dyn AuthStrategy>>,
    scraper_type: Option<ScraperType>,
    // last credentials a login was attempted with; lets clear_error restore
    // a LOGGED_IN state when the page turns out to be fine
    last_attempt: Option<Credentials>,
}

impl SessionManager {
    pub fn new(config: Arc<Config>, registry: Arc<StrategyRegistry>) -> Self {
        Self {
            config,
            registry,
            state: SessionState::logged_out(),
            browser: None,
            strategy: None,
            scraper_type: None,
            last_attempt: None,
        }
    }

    /// Builds a manager around an existing browser handle instead of
    /// connecting to the WebDriver itself.
    pub fn with_browser(
        config: Arc<Config>,
        registry: Arc<StrategyRegistry>,
        browser: Box<dyn BrowserPort>,
    ) -> Self {
        let mut manager = Self::new(config, registry);
        manager.browser = Some(browser);
        manager
    }

    pub fn get_session_state(&self) -> SessionState {
        self.state.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.status == SessionStatus::LoggedIn
    }

    fn set_error(&mut self, message: String) {
        tracing::error!("❌ Session error: {}", message);
        self.state = SessionState {
            status: SessionStatus::Error,
            carrier: None,
            credentials: None,
            error_message: Some(message),
        };
    }

    async fn ensure_browser(&mut self) -> Result<(), ScrapeError> {
        if self.browser.is_none() {
            let browser = FantocciniBrowser::connect(&self.config).await?;
            self.browser = Some(Box::new(browser));
        }
        Ok(())
    }

    /// Authenticates against the carrier portal for the given scraper type.
    ///
    /// Idempotent while already logged in with the same carrier, credential
    /// identity and scraper type. A different scraper type whose strategy
    /// shares the current login URL reuses the live session. Everything
    /// else tears the session down and logs in fresh.
    pub async fn login(
        &mut self,
        credentials: &Credentials,
        scraper_type: ScraperType,
    ) -> Result<bool, ScrapeError> {
        if self.state.status == SessionStatus::LoggedIn {
            let same_identity = self.state.carrier == Some(credentials.carrier)
                && self.state.credentials.as_ref().map(|c| c.id) == Some(credentials.id);

            if same_identity {
                if self.scraper_type == Some(scraper_type) {
                    tracing::info!(
                        "✅ Already logged in to {} as {} - nothing to do",
                        credentials.carrier,
                        mask_sensitive(&credentials.username)
                    );
                    return Ok(true);
                }

                if let Some(new_auth) = self
                    .registry
                    .auth_strategy(credentials.carrier, scraper_type)
                {
                    let current_url = self.strategy.as_ref().map(|s| s.login_url());
                    if current_url.as_deref() == Some(new_auth.login_url().as_str()) {
                        tracing::info!(
                            "♻️ Reusing {} session for scraper type {}",
                            credentials.carrier,
                            scraper_type
                        );
                        self.strategy = Some(new_auth);
                        self.scraper_type = Some(scraper_type);
                        return Ok(true);
                    }
                }
            }

            // different account or portal; start from a clean slate
            self.logout().await;
        }

        let strategy = match self.registry.auth_strategy(credentials.carrier, scraper_type) {
            Some(strategy) => strategy,
            None => {
                let message = format!(
                    "No auth strategy bound for ({}, {})",
                    credentials.carrier, scraper_type
                );
                self.set_error(message.clone());
                return Err(ScrapeError::NoStrategy(message));
            }
        };

        self.last_attempt = Some(credentials.clone());

        if let Err(e) = self.ensure_browser().await {
            self.set_error(format!("Browser session could not be acquired: {}", e));
            return Ok(false);
        }

        let outcome = match self.browser.as_deref() {
            Some(browser) => strategy.login(browser, credentials).await,
            None => Err(ScrapeError::WebDriver("Browser handle missing".to_string())),
        };

        // keep the binding around in every outcome so clear_error can
        // re-probe the actual page state
        self.strategy = Some(strategy);
        self.scraper_type = Some(scraper_type);

        match outcome {
            Ok(true) => {
                tracing::info!(
                    "✅ Logged in to {} as {}",
                    credentials.carrier,
                    mask_sensitive(&credentials.username)
                );
                self.state = SessionState {
                    status: SessionStatus::LoggedIn,
                    carrier: Some(credentials.carrier),
                    credentials: Some(credentials.clone()),
                    error_message: None,
                };
                Ok(true)
            }
            Ok(false) => {
                self.set_error(format!(
                    "Login to {} could not be verified",
                    credentials.carrier
                ));
                Ok(false)
            }
            Err(e) => {
                self.set_error(format!("Login to {} failed: {}", credentials.carrier, e));
                Ok(false)
            }
        }
    }

    /// Ends the portal session. No-op success when already logged out.
    pub async fn logout(&mut self) -> bool {
        if self.state.status == SessionStatus::LoggedOut {
            return true;
        }

        let outcome = match (self.browser.as_deref(), self.strategy.clone()) {
            (Some(browser), Some(strategy)) => strategy.logout(browser).await,
            // nothing live to log out of
            _ => Ok(true),
        };

        match outcome {
            Ok(true) => {
                tracing::info!("✅ Logged out");
                self.state = SessionState::logged_out();
                self.strategy = None;
                self.scraper_type = None;
                true
            }
            Ok(false) => {
                self.set_error("Logout could not be confirmed".to_string());
                false
            }
            Err(e) => {
                self.set_error(format!("Logout failed: {}", e));
                false
            }
        }
    }

    /// Probes the live page for the strategy's logged-in signal. Detects
    /// sessions lost externally (expired cookies, portal-side logout): the
    /// state force-transitions to LOGGED_OUT and the method returns false.
    pub async fn refresh_session_status(&mut self) -> bool {
        if self.state.status != SessionStatus::LoggedIn {
            return false;
        }

        let alive = match (self.browser.as_deref(), self.strategy.as_ref()) {
            (Some(browser), Some(strategy)) => strategy.is_logged_in(browser).await,
            _ => false,
        };

        if alive {
            return true;
        }

        tracing::warn!("⚠️ Logged-in signal gone - session was lost externally");
        self.state = SessionState::logged_out();
        self.strategy = None;
        self.scraper_type = None;
        false
    }

    /// From ERROR, re-probes the actual page and resolves deterministically
    /// to LOGGED_IN or LOGGED_OUT. Never assumes.
    pub async fn clear_error(&mut self) -> SessionStatus {
        if self.state.status != SessionStatus::Error {
            return self.state.status;
        }

        let alive = match (self.browser.as_deref(), self.strategy.as_ref()) {
            (Some(browser), Some(strategy)) => strategy.is_logged_in(browser).await,
            _ => false,
        };

        if alive {
            if let Some(credentials) = self.last_attempt.clone() {
                tracing::info!("✅ Page is actually logged in - restoring session state");
                self.state = SessionState {
                    status: SessionStatus::LoggedIn,
                    carrier: Some(credentials.carrier),
                    credentials: Some(credentials),
                    error_message: None,
                };
                return SessionStatus::LoggedIn;
            }
        }

        tracing::info!("ℹ️ Error cleared - session is logged out");
        self.state = SessionState::logged_out();
        self.strategy = None;
        self.scraper_type = None;
        SessionStatus::LoggedOut
    }

    /// Best-effort recovery for a page that stopped showing its expected
    /// elements: clear browser storage, force logout, retry the login once.
    /// The symptom is detectable; the fix is not guaranteed to resolve the
    /// portal-side issue.
    pub async fn recover_stale_session(
        &mut self,
        credentials: &Credentials,
        scraper_type: ScraperType,
    ) -> Result<bool, ScrapeError> {
        tracing::warn!("🔄 Attempting stale-session recovery for {}", credentials.carrier);

        if let Some(browser) = self.browser.as_deref() {
            if let Err(e) = browser.clear_storage().await {
                tracing::warn!("⚠️ Storage clear failed: {}", e);
            }
        }

        self.logout().await;
        self.login(credentials, scraper_type).await
    }

    /// Forces logout if needed and releases the browser handle. Safe to
    /// call any number of times.
    pub async fn cleanup(&mut self) {
        if self.state.status == SessionStatus::LoggedIn {
            self.logout().await;
        }

        if let Some(browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                tracing::warn!("⚠️ Browser close failed: {}", e);
            }
        }

        self.state = SessionState::logged_out();
        self.strategy = None;
        self.scraper_type = None;
    }

    pub fn create_scraper(
        &self,
        carrier: Carrier,
        scraper_type: ScraperType,
    ) -> Result<Arc<dyn ScraperStrategy>, ScrapeError> {
        self.registry
            .scraper_strategy(carrier, scraper_type)
            .ok_or_else(|| {
                ScrapeError::NoStrategy(format!(
                    "No scraper strategy bound for ({}, {})",
                    carrier, scraper_type
                ))
            })
    }

    /// Runs the bound scraper against the authenticated session. Total:
    /// problems land in `ScraperResult.error`.
    pub async fn execute(
        &mut self,
        config: &ScraperConfig,
        billing_cycle: &BillingCycle,
        credentials: &Credentials,
    ) -> ScraperResult {
        let request_id = Uuid::new_v4().to_string();

        if self.state.status != SessionStatus::LoggedIn {
            return ScraperResult::failed(
                request_id,
                "Session is not logged in".to_string(),
                0,
            );
        }

        let (Some(carrier), Some(scraper_type)) = (self.state.carrier, self.scraper_type) else {
            return ScraperResult::failed(
                request_id,
                "Session has no bound carrier/scraper type".to_string(),
                0,
            );
        };

        let Some(scraper) = self.registry.scraper_strategy(carrier, scraper_type) else {
            return ScraperResult::failed(
                request_id,
                format!("No scraper strategy bound for ({}, {})", carrier, scraper_type),
                0,
            );
        };

        let Some(browser) = self.browser.as_deref() else {
            return ScraperResult::failed(request_id, "Browser handle missing".to_string(), 0);
        };

        scraper
            .execute(browser, config, billing_cycle, credentials)
            .await
    }
}
