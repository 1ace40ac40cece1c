use crate::auth::generic::{enter_two_factor_code, TwoFactorSelectors};
use crate::browser::{any_present, BrowserPort, Selector};
use crate::config::Config;
use crate::errors::ScrapeError;
use crate::relay::store::{ChannelId, ChannelKind, ConsumeOutcome, RelayStore};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Where a waiting login gets its out-of-band factor from. The production
/// deployment polls the relay service over HTTP; single-process setups and
/// tests hand the store itself to the waiter.
#[async_trait]
pub trait CodeSource: Send + Sync {
    /// Consumes and returns the factor if one is available right now.
    async fn try_take(
        &self,
        channel: ChannelId,
        kind: ChannelKind,
    ) -> Result<Option<String>, ScrapeError>;
}

#[async_trait]
impl CodeSource for RelayStore {
    async fn try_take(
        &self,
        channel: ChannelId,
        kind: ChannelKind,
    ) -> Result<Option<String>, ScrapeError> {
        match self.channel(channel, kind).consume().await {
            ConsumeOutcome::Consumed { code, .. } => Ok(Some(code)),
            ConsumeOutcome::Unavailable { .. } => Ok(None),
        }
    }
}

/// HTTP client against a remote relay instance.
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RelayCodeBody {
    code: Option<String>,
    status: String,
}

impl RelayClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.relay_base_url.clone())
    }

    fn endpoint(&self, channel: ChannelId, leaf: &str) -> String {
        // root channel lives on the unprefixed legacy paths
        match channel {
            ChannelId::Root => format!("{}/{}", self.base_url, leaf),
            other => format!("{}/{}/{}", self.base_url, other, leaf),
        }
    }
}

#[async_trait]
impl CodeSource for RelayClient {
    async fn try_take(
        &self,
        channel: ChannelId,
        kind: ChannelKind,
    ) -> Result<Option<String>, ScrapeError> {
        let leaf = match kind {
            ChannelKind::Code => "code",
            ChannelKind::Link => "link",
        };

        let peek: RelayCodeBody = self
            .http
            .get(self.endpoint(channel, leaf))
            .send()
            .await?
            .json()
            .await?;

        if peek.status != "available" {
            return Ok(None);
        }

        let consumed: RelayCodeBody = self
            .http
            .post(self.endpoint(channel, &format!("{}/consume", leaf)))
            .send()
            .await?
            .json()
            .await?;

        // another waiter may have raced us between peek and consume
        if consumed.status == "consumed" {
            Ok(consumed.code)
        } else {
            Ok(None)
        }
    }
}

/// Bounded poll loop over a `CodeSource`. An unbounded wait for a
/// human-delivered SMS is never acceptable; on timeout the login attempt
/// fails cleanly.
pub struct CodeWaiter {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl CodeWaiter {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.twofa_poll_interval_ms),
            Duration::from_millis(config.twofa_wait_timeout_ms),
        )
    }

    pub async fn wait_for(
        &self,
        source: &dyn CodeSource,
        channel: ChannelId,
        kind: ChannelKind,
    ) -> Result<String, ScrapeError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        tracing::info!(
            "⏳ Waiting for out-of-band factor on channel {} (timeout {}s)",
            channel,
            self.timeout.as_secs()
        );

        loop {
            if let Some(code) = source.try_take(channel, kind).await? {
                tracing::info!("🔑 Factor received on channel {}", channel);
                return Ok(code);
            }

            if tokio::time::Instant::now() >= deadline {
                tracing::error!("❌ No factor arrived on channel {} in time", channel);
                return Err(ScrapeError::Authentication(format!(
                    "Timed out waiting for 2FA factor on channel {} after {}s",
                    channel,
                    self.timeout.as_secs()
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// SMS-code challenge step a login flow runs after credential submission.
/// Detects the challenge screen, waits on the relay, types the code in.
pub struct SmsChallenge {
    pub source: Arc<dyn CodeSource>,
    pub waiter: CodeWaiter,
    pub channel: ChannelId,
    pub markers: &'static [Selector<'static>],
    pub selectors: &'static TwoFactorSelectors,
}

impl SmsChallenge {
    pub async fn clear_if_present(
        &self,
        browser: &dyn BrowserPort,
        settle: Duration,
    ) -> Result<(), ScrapeError> {
        if !any_present(browser, self.markers).await {
            tracing::info!("ℹ️ No verification challenge on screen");
            return Ok(());
        }

        tracing::info!("🔐 Verification challenge detected");
        let code = self
            .waiter
            .wait_for(self.source.as_ref(), self.channel, ChannelKind::Code)
            .await?;
        enter_two_factor_code(browser, self.selectors, &code, settle).await
    }
}

/// Confirmation-link challenge: the portal mails/texts an approve link and
/// the login completes by opening it.
pub struct LinkChallenge {
    pub source: Arc<dyn CodeSource>,
    pub waiter: CodeWaiter,
    pub channel: ChannelId,
    pub markers: &'static [Selector<'static>],
}

impl LinkChallenge {
    pub async fn clear_if_present(
        &self,
        browser: &dyn BrowserPort,
        settle: Duration,
    ) -> Result<(), ScrapeError> {
        if !any_present(browser, self.markers).await {
            tracing::info!("ℹ️ No confirmation-link challenge on screen");
            return Ok(());
        }

        tracing::info!("🔐 Confirmation-link challenge detected");
        let link = self
            .waiter
            .wait_for(self.source.as_ref(), self.channel, ChannelKind::Link)
            .await?;

        tracing::info!("🔗 Opening confirmation link");
        browser.navigate(&link).await?;
        tokio::time::sleep(settle).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_waiter_picks_up_code() {
        let store = Arc::new(RelayStore::default());
        let waiter = CodeWaiter::new(Duration::from_millis(10), Duration::from_secs(2));

        let feeder = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            feeder
                .channel(ChannelId::Att, ChannelKind::Code)
                .receive("Your AT&T code is 778899")
                .await;
        });

        let code = waiter
            .wait_for(store.as_ref(), ChannelId::Att, ChannelKind::Code)
            .await
            .unwrap();
        assert_eq!(code, "778899");
    }

    #[tokio::test]
    async fn test_waiter_times_out() {
        let store = RelayStore::default();
        let waiter = CodeWaiter::new(Duration::from_millis(10), Duration::from_millis(50));

        let err = waiter
            .wait_for(&store, ChannelId::Tmobile, ChannelKind::Code)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication(_)));
    }
}
