pub mod generic;
pub mod two_factor;

use crate::browser::BrowserPort;
use crate::errors::ScrapeError;
use crate::models::{Carrier, Credentials};
use async_trait::async_trait;

pub use generic::{
    enter_two_factor_code, generic_login, generic_logout, probe_logged_in, LoginSelectors,
    TwoFactorSelectors,
};
pub use two_factor::{CodeSource, CodeWaiter, LinkChallenge, RelayClient, SmsChallenge};

/// Per-carrier login procedure. Implementations are stateless; the browser
/// handle is owned by the session manager and passed in per call.
///
/// Contract: `login` and `logout` converge to a definite boolean and leave
/// the page in a state `is_logged_in` can observe.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn carrier(&self) -> Carrier;

    /// Entry URL for this carrier/portal combination. Two scraper types
    /// whose strategies share a login URL can share one live session.
    fn login_url(&self) -> String;

    async fn login(
        &self,
        browser: &dyn BrowserPort,
        credentials: &Credentials,
    ) -> Result<bool, ScrapeError>;

    async fn logout(&self, browser: &dyn BrowserPort) -> Result<bool, ScrapeError>;

    async fn is_logged_in(&self, browser: &dyn BrowserPort) -> bool;
}
