mod common;

use common::{credentials, fast_config, MockBrowser, SharedBrowser};
use std::sync::Arc;
use telco_collector::auth::CodeSource;
use telco_collector::carriers::StrategyRegistry;
use telco_collector::errors::ScrapeError;
use telco_collector::models::{Carrier, ScraperType, SessionStatus};
use telco_collector::relay::{ChannelId, ChannelKind, RelayStore};
use telco_collector::session::SessionManager;

const TELUS_LOGIN_PAGE: &[&str] = &[
    "css:input#username",
    "css:input#password",
    "css:button[data-testid='login-submit']",
];
const TELUS_DASHBOARD: &str = "css:[data-testid='account-overview']";
const TELUS_LOGOUT_LINK: &str = "css:a[href*='logout']";

const BELL_LOGIN_PAGE: &[&str] = &[
    "css:input#USER",
    "css:input#PASSWORD",
    "css:button#loginButton",
];
const BELL_DASHBOARD: &str = "css:[class*='dashboard']";

const ATT_LOGIN_PAGE: &[&str] = &["css:input#userID", "css:input#password", "css:button#signin"];
const ATT_MFA_INPUT: &str = "css:input#verificationCode";
const ATT_MFA_SUBMIT: &str = "css:button#submitCode";
const ATT_DASHBOARD: &str = "css:[data-testid='account-dashboard']";

fn setup(
    store: Arc<RelayStore>,
) -> (Arc<MockBrowser>, SessionManager) {
    let config = fast_config();
    let source: Arc<dyn CodeSource> = store;
    let registry = Arc::new(StrategyRegistry::with_code_source(config.clone(), source));
    let browser = MockBrowser::new();
    let manager = SessionManager::with_browser(
        config,
        registry,
        Box::new(SharedBrowser(browser.clone())),
    );
    (browser, manager)
}

#[tokio::test]
async fn test_login_success() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD]);

    let creds = credentials(1, Carrier::Telus);
    let ok = manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap();

    assert!(ok);
    let state = manager.get_session_state();
    assert_eq!(state.status, SessionStatus::LoggedIn);
    assert_eq!(state.carrier, Some(Carrier::Telus));
    assert_eq!(state.credentials.as_ref().map(|c| c.id), Some(1));
    assert!(state.error_message.is_none());
}

#[tokio::test]
async fn test_login_is_idempotent_for_same_identity() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD]);

    let creds = credentials(1, Carrier::Telus);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    let navigations_after_first = browser.navigation_count();

    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());

    // no second trip to the portal
    assert_eq!(browser.navigation_count(), navigations_after_first);
}

#[tokio::test]
async fn test_login_reuses_session_for_same_login_url() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(BELL_LOGIN_PAGE);
    browser.set_present(&[BELL_DASHBOARD]);

    let creds = credentials(3, Carrier::Bell);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    let navigations_after_first = browser.navigation_count();

    // same portal, different scraper type: the live session is kept
    assert!(manager.login(&creds, ScraperType::DailyUsage).await.unwrap());
    assert_eq!(browser.navigation_count(), navigations_after_first);
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedIn
    );
}

#[tokio::test]
async fn test_login_unbound_pair_errors_and_propagates() {
    let (_browser, mut manager) = setup(Arc::new(RelayStore::default()));

    let creds = credentials(1, Carrier::Telus);
    let err = manager
        .login(&creds, ScraperType::PdfInvoice)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::NoStrategy(_)));
    let state = manager.get_session_state();
    assert_eq!(state.status, SessionStatus::Error);
    assert!(state
        .error_message
        .unwrap()
        .contains("No auth strategy bound"));
}

#[tokio::test]
async fn test_login_rejected_credentials_set_error_state() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&["css:.error-message"]);
    browser.set_text("css:.error-message", "Invalid username or password");

    let creds = credentials(1, Carrier::Telus);
    let ok = manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap();

    assert!(!ok);
    let state = manager.get_session_state();
    assert_eq!(state.status, SessionStatus::Error);
    assert!(state
        .error_message
        .unwrap()
        .contains("Invalid username or password"));
    assert!(state.credentials.is_none());
}

#[tokio::test]
async fn test_two_factor_login_consumes_relayed_code() {
    let store = Arc::new(RelayStore::default());
    store
        .channel(ChannelId::Att, ChannelKind::Code)
        .receive("Your code is 482913")
        .await;

    let (browser, mut manager) = setup(store.clone());
    browser.set_present(ATT_LOGIN_PAGE);
    browser.set_present(&[ATT_MFA_INPUT, ATT_MFA_SUBMIT, ATT_DASHBOARD]);

    let creds = credentials(9, Carrier::Att);
    assert!(manager.login(&creds, ScraperType::DailyUsage).await.unwrap());
    assert!(browser.was_filled_with(ATT_MFA_INPUT, "482913"));

    // the relayed code is gone after the login took it
    assert!(matches!(
        store
            .channel(ChannelId::Att, ChannelKind::Code)
            .consume()
            .await,
        telco_collector::relay::store::ConsumeOutcome::Unavailable { .. }
    ));
}

#[tokio::test]
async fn test_two_factor_timeout_fails_cleanly() {
    // challenge screen up, but no SMS ever arrives
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(ATT_LOGIN_PAGE);
    browser.set_present(&[ATT_MFA_INPUT, ATT_MFA_SUBMIT]);

    let creds = credentials(9, Carrier::Att);
    let ok = manager.login(&creds, ScraperType::DailyUsage).await.unwrap();

    assert!(!ok);
    let state = manager.get_session_state();
    assert_eq!(state.status, SessionStatus::Error);
    assert!(state.error_message.unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_refresh_detects_externally_lost_session() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD]);

    let creds = credentials(1, Carrier::Telus);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    assert!(manager.refresh_session_status().await);

    // portal dropped the session behind our back
    browser.remove_present(&[TELUS_DASHBOARD]);

    assert!(!manager.refresh_session_status().await);
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedOut
    );
}

#[tokio::test]
async fn test_clear_error_resolves_to_logged_out() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    // no dashboard indicator: login submits but cannot be verified

    let creds = credentials(1, Carrier::Telus);
    assert!(!manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    assert_eq!(manager.get_session_state().status, SessionStatus::Error);

    let resolved = manager.clear_error().await;
    assert_eq!(resolved, SessionStatus::LoggedOut);
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedOut
    );
}

#[tokio::test]
async fn test_clear_error_resolves_to_logged_in_when_page_is_fine() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);

    let creds = credentials(1, Carrier::Telus);
    assert!(!manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());
    assert_eq!(manager.get_session_state().status, SessionStatus::Error);

    // the dashboard was just slow; by probe time it is there
    browser.set_present(&[TELUS_DASHBOARD]);

    let resolved = manager.clear_error().await;
    assert_eq!(resolved, SessionStatus::LoggedIn);
    let state = manager.get_session_state();
    assert_eq!(state.carrier, Some(Carrier::Telus));
    assert_eq!(state.credentials.as_ref().map(|c| c.id), Some(1));
}

#[tokio::test]
async fn test_logout_roundtrip() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD, TELUS_LOGOUT_LINK]);

    let creds = credentials(1, Carrier::Telus);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());

    assert!(manager.logout().await);
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedOut
    );

    // logging out again stays a no-op success
    assert!(manager.logout().await);
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let (browser, mut manager) = setup(Arc::new(RelayStore::default()));
    browser.set_present(TELUS_LOGIN_PAGE);
    browser.set_present(&[TELUS_DASHBOARD, TELUS_LOGOUT_LINK]);

    let creds = credentials(1, Carrier::Telus);
    assert!(manager
        .login(&creds, ScraperType::MonthlyReports)
        .await
        .unwrap());

    manager.cleanup().await;
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedOut
    );

    manager.cleanup().await;
    assert_eq!(
        manager.get_session_state().status,
        SessionStatus::LoggedOut
    );
}

#[tokio::test]
async fn test_create_scraper_unknown_pair() {
    let (_browser, manager) = setup(Arc::new(RelayStore::default()));

    assert!(manager
        .create_scraper(Carrier::Bell, ScraperType::MonthlyReports)
        .is_ok());
    assert!(matches!(
        manager.create_scraper(Carrier::Tmobile, ScraperType::PdfInvoice),
        Err(ScrapeError::NoStrategy(_))
    ));
}
