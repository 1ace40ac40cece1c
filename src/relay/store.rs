use crate::utils::{extract_code, extract_link};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_CODE_TTL: Duration = Duration::from_secs(300);

/// Carrier channels the relay serves. `Root` is the legacy unprefixed
/// surface the Bell webhook was originally pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Root,
    Verizon,
    Att,
    Tmobile,
}

impl ChannelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelId::Root => "root",
            ChannelId::Verizon => "verizon",
            ChannelId::Att => "att",
            ChannelId::Tmobile => "tmobile",
        }
    }

    pub fn all() -> &'static [ChannelId] {
        &[
            ChannelId::Root,
            ChannelId::Verizon,
            ChannelId::Att,
            ChannelId::Tmobile,
        ]
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            // bell webhooks predate the per-carrier paths
            "root" | "bell" => Ok(ChannelId::Root),
            "verizon" => Ok(ChannelId::Verizon),
            "att" => Ok(ChannelId::Att),
            "tmobile" => Ok(ChannelId::Tmobile),
            other => Err(format!("Unknown relay channel: {}", other)),
        }
    }
}

/// What kind of MFA factor a channel carries: a numeric one-time code or
/// an allow/deny confirmation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Code,
    Link,
}

#[derive(Debug, Clone)]
pub struct OneTimeCode {
    pub code: String,
    pub received_at: DateTime<Utc>,
    pub consumed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    Empty,
    Available,
    Consumed,
    Expired,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveOutcome {
    Stored {
        code: String,
        received_at: DateTime<Utc>,
    },
    NoCodeFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeekOutcome {
    Available {
        code: String,
        received_at: DateTime<Utc>,
    },
    Unavailable {
        status: CodeStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumeOutcome {
    Consumed {
        code: String,
        received_at: DateTime<Utc>,
    },
    Unavailable {
        status: CodeStatus,
    },
}

/// Non-mutating view for the aggregate status endpoint.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot {
    pub has_code: bool,
    pub code_timestamp: Option<DateTime<Utc>>,
    pub code_used: bool,
}

/// Single-slot store for one carrier channel. At most one outstanding
/// code; the latest receipt always wins. All mutation happens under the
/// slot mutex, held only for the read-modify-write.
pub struct OtpChannel {
    kind: ChannelKind,
    ttl: Duration,
    slot: Mutex<Option<OneTimeCode>>,
}

impl OtpChannel {
    pub fn new(kind: ChannelKind, ttl: Duration) -> Self {
        Self {
            kind,
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn extract(&self, text: &str) -> Option<String> {
        match self.kind {
            ChannelKind::Code => extract_code(text),
            ChannelKind::Link => extract_link(text),
        }
    }

    fn is_expired(&self, entry: &OneTimeCode) -> bool {
        let age = Utc::now()
            .signed_duration_since(entry.received_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.ttl
    }

    /// Extracts a code/link from free-text payload content and replaces the
    /// slot. A payload without an extractable value is a reportable status,
    /// not an error.
    pub async fn receive(&self, text: &str) -> ReceiveOutcome {
        let Some(code) = self.extract(text) else {
            return ReceiveOutcome::NoCodeFound;
        };

        let received_at = Utc::now();
        let mut slot = self.slot.lock().await;
        *slot = Some(OneTimeCode {
            code: code.clone(),
            received_at,
            consumed: false,
        });

        ReceiveOutcome::Stored { code, received_at }
    }

    pub async fn peek(&self) -> PeekOutcome {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            None => PeekOutcome::Unavailable {
                status: CodeStatus::Empty,
            },
            // expiry beats the consumed flag; the stale entry stays cleared
            Some(entry) if self.is_expired(&entry) => PeekOutcome::Unavailable {
                status: CodeStatus::Expired,
            },
            Some(entry) => {
                let outcome = if entry.consumed {
                    PeekOutcome::Unavailable {
                        status: CodeStatus::Consumed,
                    }
                } else {
                    PeekOutcome::Available {
                        code: entry.code.clone(),
                        received_at: entry.received_at,
                    }
                };
                *slot = Some(entry);
                outcome
            }
        }
    }

    /// Check-and-mark in one critical section. Two racing consumers get
    /// exactly one `Consumed`.
    pub async fn consume(&self) -> ConsumeOutcome {
        let mut slot = self.slot.lock().await;
        match slot.take() {
            None => ConsumeOutcome::Unavailable {
                status: CodeStatus::Empty,
            },
            Some(entry) if self.is_expired(&entry) => ConsumeOutcome::Unavailable {
                status: CodeStatus::Expired,
            },
            Some(entry) if entry.consumed => {
                let outcome = ConsumeOutcome::Unavailable {
                    status: CodeStatus::Consumed,
                };
                *slot = Some(entry);
                outcome
            }
            Some(mut entry) => {
                entry.consumed = true;
                let outcome = ConsumeOutcome::Consumed {
                    code: entry.code.clone(),
                    received_at: entry.received_at,
                };
                *slot = Some(entry);
                outcome
            }
        }
    }

    pub async fn snapshot(&self) -> ChannelSnapshot {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            None => ChannelSnapshot {
                has_code: false,
                code_timestamp: None,
                code_used: false,
            },
            Some(entry) => ChannelSnapshot {
                has_code: !entry.consumed && !self.is_expired(entry),
                code_timestamp: Some(entry.received_at),
                code_used: entry.consumed,
            },
        }
    }
}

/// All relay channels, built once at startup. Each carrier gets an
/// independently locked code slot, Verizon additionally a link slot for
/// its confirmation-link factor; receipts for different carriers never
/// block each other.
pub struct RelayStore {
    code_channels: HashMap<ChannelId, OtpChannel>,
    link_channels: HashMap<ChannelId, OtpChannel>,
}

impl RelayStore {
    pub fn new(ttl: Duration) -> Self {
        let mut code_channels = HashMap::new();
        let mut link_channels = HashMap::new();
        for id in ChannelId::all() {
            code_channels.insert(*id, OtpChannel::new(ChannelKind::Code, ttl));
            link_channels.insert(*id, OtpChannel::new(ChannelKind::Link, ttl));
        }
        Self {
            code_channels,
            link_channels,
        }
    }

    pub fn channel(&self, id: ChannelId, kind: ChannelKind) -> &OtpChannel {
        let map = match kind {
            ChannelKind::Code => &self.code_channels,
            ChannelKind::Link => &self.link_channels,
        };
        // every ChannelId is populated in new()
        map.get(&id).expect("relay channel missing")
    }

    pub async fn snapshots(&self) -> Vec<(ChannelId, ChannelSnapshot)> {
        let mut out = Vec::with_capacity(ChannelId::all().len());
        for id in ChannelId::all() {
            out.push((*id, self.channel(*id, ChannelKind::Code).snapshot().await));
        }
        out
    }
}

impl Default for RelayStore {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_then_peek() {
        let channel = OtpChannel::new(ChannelKind::Code, DEFAULT_CODE_TTL);
        let outcome = channel.receive("Your code is 482913").await;
        assert!(matches!(outcome, ReceiveOutcome::Stored { ref code, .. } if code == "482913"));

        match channel.peek().await {
            PeekOutcome::Available { code, .. } => assert_eq!(code, "482913"),
            other => panic!("expected available, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_latest_receipt_wins() {
        let channel = OtpChannel::new(ChannelKind::Code, DEFAULT_CODE_TTL);
        channel.receive("first: 111111").await;
        channel.receive("second: 222222").await;

        match channel.consume().await {
            ConsumeOutcome::Consumed { code, .. } => assert_eq!(code, "222222"),
            other => panic!("expected consumed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_code_found() {
        let channel = OtpChannel::new(ChannelKind::Code, DEFAULT_CODE_TTL);
        assert_eq!(
            channel.receive("Hello, your bill is ready").await,
            ReceiveOutcome::NoCodeFound
        );
        assert_eq!(
            channel.peek().await,
            PeekOutcome::Unavailable {
                status: CodeStatus::Empty
            }
        );
    }

    #[tokio::test]
    async fn test_consume_is_exactly_once() {
        let channel = OtpChannel::new(ChannelKind::Code, DEFAULT_CODE_TTL);
        channel.receive("code 654321").await;

        let first = channel.consume().await;
        let second = channel.consume().await;

        assert!(matches!(first, ConsumeOutcome::Consumed { .. }));
        assert_eq!(
            second,
            ConsumeOutcome::Unavailable {
                status: CodeStatus::Consumed
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_consumers_get_exactly_one_code() {
        let store = std::sync::Arc::new(RelayStore::default());
        store
            .channel(ChannelId::Verizon, ChannelKind::Code)
            .receive("code 424242")
            .await;

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .channel(ChannelId::Verizon, ChannelKind::Code)
                    .consume()
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .channel(ChannelId::Verizon, ChannelKind::Code)
                    .consume()
                    .await
            })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        let wins = [&a, &b]
            .iter()
            .filter(|o| matches!(o, ConsumeOutcome::Consumed { .. }))
            .count();
        assert_eq!(wins, 1, "exactly one consumer must win: {:?} / {:?}", a, b);
    }

    #[tokio::test]
    async fn test_expiry_beats_consumed_flag() {
        let channel = OtpChannel::new(ChannelKind::Code, Duration::from_millis(20));
        channel.receive("code 654321").await;
        channel.consume().await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(
            channel.peek().await,
            PeekOutcome::Unavailable {
                status: CodeStatus::Expired
            }
        );
        // slot was cleared, a fresh receive works again
        channel.receive("code 999999").await;
        assert!(matches!(
            channel.peek().await,
            PeekOutcome::Available { .. }
        ));
    }

    #[tokio::test]
    async fn test_link_channel_stores_url() {
        let channel = OtpChannel::new(ChannelKind::Link, DEFAULT_CODE_TTL);
        channel
            .receive("Approve here: [https://sso.verizon.com/approve?t=abc]")
            .await;

        match channel.consume().await {
            ConsumeOutcome::Consumed { code, .. } => {
                assert_eq!(code, "https://sso.verizon.com/approve?t=abc")
            }
            other => panic!("expected consumed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_channels_are_independent() {
        let store = RelayStore::default();
        store
            .channel(ChannelId::Att, ChannelKind::Code)
            .receive("att code 111111")
            .await;

        assert!(matches!(
            store.channel(ChannelId::Att, ChannelKind::Code).peek().await,
            PeekOutcome::Available { .. }
        ));
        assert!(matches!(
            store
                .channel(ChannelId::Tmobile, ChannelKind::Code)
                .peek()
                .await,
            PeekOutcome::Unavailable {
                status: CodeStatus::Empty
            }
        ));
    }
}
