use crate::browser::{any_present, try_click, try_fill, BrowserPort, Selector};
use crate::errors::ScrapeError;
use crate::models::Credentials;
use crate::utils::mask_sensitive;
use std::time::Duration;

/// Selector catalog a carrier module feeds into the shared login flow.
/// Each list is tried in order; portals redesign often enough that a single
/// selector per field does not survive.
pub struct LoginSelectors {
    pub username_inputs: &'static [Selector<'static>],
    pub password_inputs: &'static [Selector<'static>],
    pub submit_buttons: &'static [Selector<'static>],
    pub logged_in_indicators: &'static [Selector<'static>],
    pub error_banners: &'static [Selector<'static>],
    pub logout_links: &'static [Selector<'static>],
}

pub struct TwoFactorSelectors {
    pub code_inputs: &'static [Selector<'static>],
    pub submit_buttons: &'static [Selector<'static>],
}

/// Shared credential-submission flow: navigate, fill, submit, scan for an
/// error banner. Carrier strategies call this and then run their own 2FA
/// step (if any) before confirming via `probe_logged_in`.
pub async fn generic_login(
    browser: &dyn BrowserPort,
    selectors: &LoginSelectors,
    login_url: &str,
    credentials: &Credentials,
    settle: Duration,
) -> Result<(), ScrapeError> {
    tracing::info!("🔍 Opening login page: {}", login_url);
    tracing::info!("👤 User: {}", mask_sensitive(&credentials.username));

    browser.navigate(login_url).await?;
    tokio::time::sleep(settle).await;

    let current_url = browser.current_url().await?;
    tracing::info!("✅ Login page loaded: {}", current_url);

    if !try_fill(browser, selectors.username_inputs, &credentials.username).await {
        tracing::error!("❌ Username input not found with any selector!");
        return Err(ScrapeError::Authentication(
            "Username input not found".to_string(),
        ));
    }
    tracing::info!(
        "✅ Username filled: {}",
        mask_sensitive(&credentials.username)
    );

    if !try_fill(browser, selectors.password_inputs, &credentials.password).await {
        tracing::error!("❌ Password input not found with any selector!");
        return Err(ScrapeError::Authentication(
            "Password input not found".to_string(),
        ));
    }
    tracing::info!("✅ Password filled");

    if !try_click(browser, selectors.submit_buttons).await {
        tracing::error!("❌ Submit button not found with any selector!");
        return Err(ScrapeError::Authentication(
            "Submit button not found".to_string(),
        ));
    }
    tracing::info!("✅ Submit clicked");

    tokio::time::sleep(settle).await;

    scan_error_banners(browser, selectors.error_banners).await?;

    let post_url = browser.current_url().await?;
    tracing::info!("📍 URL after submit: {}", post_url);

    Ok(())
}

/// Portals surface rejection inline rather than by status code; a non-empty
/// error banner after submit means the credentials were refused.
pub async fn scan_error_banners(
    browser: &dyn BrowserPort,
    banners: &[Selector<'_>],
) -> Result<(), ScrapeError> {
    for selector in banners {
        if browser.exists(selector).await {
            if let Ok(text) = browser.text(selector).await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    tracing::error!("❌ Login error banner ({}): {}", selector, text);
                    return Err(ScrapeError::Authentication(format!(
                        "Portal rejected login: {}",
                        text
                    )));
                }
            }
        }
    }
    Ok(())
}

pub async fn probe_logged_in(browser: &dyn BrowserPort, indicators: &[Selector<'_>]) -> bool {
    any_present(browser, indicators).await
}

pub async fn generic_logout(
    browser: &dyn BrowserPort,
    selectors: &LoginSelectors,
    settle: Duration,
) -> Result<bool, ScrapeError> {
    if !probe_logged_in(browser, selectors.logged_in_indicators).await {
        return Ok(true);
    }

    if try_click(browser, selectors.logout_links).await {
        tokio::time::sleep(settle).await;
        tracing::info!("✅ Logout link clicked");
        return Ok(true);
    }

    tracing::warn!("⚠️ Logout link not found");
    Ok(false)
}

/// Types a relayed one-time code into the challenge form and submits it.
pub async fn enter_two_factor_code(
    browser: &dyn BrowserPort,
    selectors: &TwoFactorSelectors,
    code: &str,
    settle: Duration,
) -> Result<(), ScrapeError> {
    if !try_fill(browser, selectors.code_inputs, code).await {
        return Err(ScrapeError::Authentication(
            "Verification code input not found".to_string(),
        ));
    }
    tracing::info!("✅ Verification code entered");

    tokio::time::sleep(Duration::from_millis(500)).await;

    if try_click(browser, selectors.submit_buttons).await {
        tracing::info!("✅ Verification code submitted");
    }

    tokio::time::sleep(settle).await;
    Ok(())
}
