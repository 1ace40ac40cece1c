use crate::config::Config;
use crate::errors::ScrapeError;
use crate::relay::email::{self, MailboxClient};
use crate::relay::store::{
    ChannelId, ChannelKind, CodeStatus, ConsumeOutcome, PeekOutcome, ReceiveOutcome, RelayStore,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::SystemTime;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<RelayStore>,
    pub mailbox: Option<Arc<dyn MailboxClient>>,
    pub start_time: SystemTime,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        // legacy unprefixed surface == root (bell) channel
        .route("/sms", post(root_sms_handler))
        .route("/code", get(root_code_handler))
        .route("/code/consume", post(root_consume_handler))
        // per-carrier channels
        .route("/:channel/sms", post(sms_handler))
        .route("/:channel/code", get(code_handler))
        .route("/:channel/code/consume", post(consume_handler))
        .route("/:channel/link", get(link_handler))
        .route("/:channel/link/consume", post(link_consume_handler))
        // email-based 2FA variant
        .route("/api/v1/:carrier", get(email::email_events_handler))
        .with_state(state)
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SmsResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub code: Option<String>,
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ChannelStatusEntry {
    pub has_code: bool,
    pub code_timestamp: Option<DateTime<Utc>>,
    pub code_used: bool,
}

#[derive(Debug, Deserialize)]
struct WebhookFrom {
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    text: String,
    from: Option<WebhookFrom>,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    data: WebhookData,
}

/// The webhook gateway has delivered two body shapes over time: the current
/// `{data:{payload:{text, from:{phone_number}}}}` envelope and a legacy
/// single-key `{key: text}` object. Anything else is a 400.
fn parse_webhook_body(body: &serde_json::Value) -> Option<(String, Option<String>)> {
    if let Ok(envelope) = serde_json::from_value::<WebhookEnvelope>(body.clone()) {
        let from = envelope
            .data
            .payload
            .from
            .and_then(|f| f.phone_number);
        return Some((envelope.data.payload.text, from));
    }

    let obj = body.as_object()?;
    if obj.len() == 1 {
        if let Some(text) = obj.values().next().and_then(|v| v.as_str()) {
            return Some((text.to_string(), None));
        }
    }
    None
}

fn parse_channel(raw: &str) -> Result<ChannelId, ScrapeError> {
    raw.parse::<ChannelId>().map_err(ScrapeError::Parse)
}

fn peek_status_str(status: CodeStatus) -> &'static str {
    match status {
        CodeStatus::Empty => "no code available",
        CodeStatus::Available => "available",
        CodeStatus::Consumed => "code already used",
        CodeStatus::Expired => "expired",
    }
}

fn consume_status_str(status: CodeStatus) -> &'static str {
    match status {
        CodeStatus::Expired => "expired",
        _ => "no code available or already used",
    }
}

async fn receive_into(
    state: &AppState,
    channel: ChannelId,
    body: serde_json::Value,
) -> Result<impl IntoResponse, ScrapeError> {
    let Some((text, from)) = parse_webhook_body(&body) else {
        tracing::warn!("⚠️ Unrecognized webhook body on channel {}", channel);
        return Err(ScrapeError::Parse(
            "Webhook body matches neither known shape".to_string(),
        ));
    };

    // a message can carry a confirmation link instead of (or next to) a
    // code; feed the link slot too so link-factor logins see it
    if let ReceiveOutcome::Stored { .. } = state
        .store
        .channel(channel, ChannelKind::Link)
        .receive(&text)
        .await
    {
        tracing::info!("🔗 {} - confirmation link relayed", channel);
    }

    match state
        .store
        .channel(channel, ChannelKind::Code)
        .receive(&text)
        .await
    {
        ReceiveOutcome::Stored { code, received_at } => {
            tracing::info!("📨 {} - code received ({} chars)", channel, code.len());
            Ok((
                StatusCode::OK,
                Json(SmsResponse {
                    status: "stored".to_string(),
                    code: Some(code),
                    timestamp: Some(received_at),
                    from,
                }),
            ))
        }
        ReceiveOutcome::NoCodeFound => {
            tracing::info!("ℹ️ {} - message had no extractable code", channel);
            Ok((
                StatusCode::OK,
                Json(SmsResponse {
                    status: "no code found".to_string(),
                    code: None,
                    timestamp: None,
                    from,
                }),
            ))
        }
    }
}

async fn peek_channel(state: &AppState, channel: ChannelId, kind: ChannelKind) -> CodeResponse {
    match state.store.channel(channel, kind).peek().await {
        PeekOutcome::Available { code, received_at } => CodeResponse {
            code: Some(code),
            status: "available".to_string(),
            timestamp: Some(received_at),
        },
        PeekOutcome::Unavailable { status } => CodeResponse {
            code: None,
            status: peek_status_str(status).to_string(),
            timestamp: None,
        },
    }
}

async fn consume_channel(state: &AppState, channel: ChannelId, kind: ChannelKind) -> CodeResponse {
    match state.store.channel(channel, kind).consume().await {
        ConsumeOutcome::Consumed { code, received_at } => {
            tracing::info!("🔑 {} - code consumed", channel);
            CodeResponse {
                code: Some(code),
                status: "consumed".to_string(),
                timestamp: Some(received_at),
            }
        }
        ConsumeOutcome::Unavailable { status } => CodeResponse {
            code: None,
            status: consume_status_str(status).to_string(),
            timestamp: None,
        },
    }
}

async fn root_sms_handler(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ScrapeError> {
    receive_into(&state, ChannelId::Root, body).await
}

async fn root_code_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(peek_channel(&state, ChannelId::Root, ChannelKind::Code).await)
}

async fn root_consume_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(consume_channel(&state, ChannelId::Root, ChannelKind::Code).await)
}

async fn sms_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ScrapeError> {
    let channel = parse_channel(&channel)?;
    receive_into(&state, channel, body).await
}

async fn code_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, ScrapeError> {
    let channel = parse_channel(&channel)?;
    Ok(Json(peek_channel(&state, channel, ChannelKind::Code).await))
}

async fn consume_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, ScrapeError> {
    let channel = parse_channel(&channel)?;
    Ok(Json(
        consume_channel(&state, channel, ChannelKind::Code).await,
    ))
}

async fn link_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, ScrapeError> {
    let channel = parse_channel(&channel)?;
    Ok(Json(peek_channel(&state, channel, ChannelKind::Link).await))
}

async fn link_consume_handler(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<impl IntoResponse, ScrapeError> {
    let channel = parse_channel(&channel)?;
    Ok(Json(
        consume_channel(&state, channel, ChannelKind::Link).await,
    ))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut channels = BTreeMap::new();
    for (id, snapshot) in state.store.snapshots().await {
        channels.insert(
            id.as_str().to_string(),
            ChannelStatusEntry {
                has_code: snapshot.has_code,
                code_timestamp: snapshot.code_timestamp,
                code_used: snapshot.code_used,
            },
        );
    }
    (StatusCode::OK, Json(channels))
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SystemTime::now()
        .duration_since(state.start_time)
        .unwrap_or_default()
        .as_secs();

    let response = HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        timestamp: Utc::now(),
    };

    (StatusCode::OK, Json(response))
}
