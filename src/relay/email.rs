use crate::errors::ScrapeError;
use crate::relay::routes::AppState;
use crate::relay::store::{ChannelId, ChannelKind};
use crate::utils::{extract_code, extract_link};
use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Mailbox lookup for carriers that deliver the second factor by email.
/// The relay polls this instead of receiving webhooks; same channel state
/// machine on the other side.
#[async_trait]
pub trait MailboxClient: Send + Sync {
    async fn fetch_messages(&self, alias: &str) -> Result<Vec<MailMessage>, ScrapeError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// REST mailbox API client (inbox-per-alias services).
pub struct HttpMailbox {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpMailbox {
    pub fn new(base_url: String, api_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_token,
        }
    }
}

#[async_trait]
impl MailboxClient for HttpMailbox {
    async fn fetch_messages(&self, alias: &str) -> Result<Vec<MailMessage>, ScrapeError> {
        let url = format!("{}/api/messages", self.base_url.trim_end_matches('/'));
        let mut request = self.http.get(&url).query(&[("alias", alias), ("limit", "10")]);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Relay(format!(
                "Mailbox API returned {}",
                response.status()
            )));
        }

        Ok(response.json::<Vec<MailMessage>>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailEventsQuery {
    pub email_alias: String,
}

enum StreamPhase {
    Polling,
    Finishing,
    Done,
}

struct StreamState {
    state: AppState,
    mailbox: Arc<dyn MailboxClient>,
    channel: ChannelId,
    alias: String,
    started_at: DateTime<Utc>,
    deadline: tokio::time::Instant,
    phase: StreamPhase,
}

/// `GET /api/v1/{carrier}?email_alias=...` - server-sent events emitting
/// `code` / `link` / `endpoint_error` / `done` while polling the mailbox.
pub async fn email_events_handler(
    State(state): State<AppState>,
    Path(carrier): Path<String>,
    Query(query): Query<EmailEventsQuery>,
) -> Result<Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>, ScrapeError> {
    let channel = carrier
        .parse::<ChannelId>()
        .map_err(ScrapeError::Parse)?;

    let Some(mailbox) = state.mailbox.clone() else {
        return Err(ScrapeError::Relay(
            "Mailbox API is not configured".to_string(),
        ));
    };

    tracing::info!(
        "📧 Email 2FA stream opened: channel={} alias={}",
        channel,
        query.email_alias
    );

    let poll_interval = Duration::from_millis(state.config.mailbox_poll_interval_ms);
    let timeout = Duration::from_millis(state.config.twofa_wait_timeout_ms);

    let initial = StreamState {
        state,
        mailbox,
        channel,
        alias: query.email_alias,
        started_at: Utc::now(),
        deadline: tokio::time::Instant::now() + timeout,
        phase: StreamPhase::Polling,
    };

    let stream = futures::stream::unfold(initial, move |mut st| async move {
        match st.phase {
            StreamPhase::Done => None,
            StreamPhase::Finishing => {
                st.phase = StreamPhase::Done;
                Some((
                    Ok::<_, Infallible>(Event::default().event("done").data("done")),
                    st,
                ))
            }
            StreamPhase::Polling => {
                loop {
                    if tokio::time::Instant::now() >= st.deadline {
                        st.phase = StreamPhase::Done;
                        return Some((
                            Ok(Event::default().event("done").data("timeout")),
                            st,
                        ));
                    }

                    let messages = match st.mailbox.fetch_messages(&st.alias).await {
                        Ok(messages) => messages,
                        Err(e) => {
                            tracing::error!("❌ Mailbox poll failed: {}", e);
                            st.phase = StreamPhase::Finishing;
                            return Some((
                                Ok(Event::default()
                                    .event("endpoint_error")
                                    .data(e.to_string())),
                                st,
                            ));
                        }
                    };

                    // only messages that arrived for this wait; a little
                    // slack for mailbox clock skew
                    let cutoff = st.started_at - ChronoDuration::seconds(30);
                    for message in messages.iter().filter(|m| m.received_at >= cutoff) {
                        let haystack = format!("{}\n{}", message.subject, message.body);

                        if let Some(code) = extract_code(&haystack) {
                            st.state
                                .store
                                .channel(st.channel, ChannelKind::Code)
                                .receive(&haystack)
                                .await;
                            tracing::info!("✅ {} - email code relayed", st.channel);
                            st.phase = StreamPhase::Finishing;
                            return Some((Ok(Event::default().event("code").data(code)), st));
                        }

                        if let Some(link) = extract_link(&haystack) {
                            st.state
                                .store
                                .channel(st.channel, ChannelKind::Link)
                                .receive(&haystack)
                                .await;
                            tracing::info!("✅ {} - email link relayed", st.channel);
                            st.phase = StreamPhase::Finishing;
                            return Some((Ok(Event::default().event("link").data(link)), st));
                        }
                    }

                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    });

    Ok(Sse::new(Box::pin(stream) as Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>)
        .keep_alive(KeepAlive::default()))
}
