//! Channel Drivers — the uniform send/ingest contract wrapping external
//! providers (spec §4.12).

pub mod email;
pub mod linkedin;
pub mod mail;
pub mod sms;
pub mod test_mode;
pub mod voice;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::resource::Resource;

/// The five outreach channels (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ChannelKind {
    Email,
    Sms,
    Voice,
    LinkedIn,
    Mail,
}

impl ChannelKind {
    /// Human-readable name used in logs and activity records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Voice => "voice",
            Self::LinkedIn => "linkedin",
            Self::Mail => "mail",
        }
    }
}

/// Outgoing send content, opaque to the driver beyond what it needs to render
/// (spec §4.12). Personalization is produced upstream; this subsystem only
/// stores and dispatches references to it (spec §1 non-goals).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundContent {
    pub subject: Option<String>,
    pub body: String,
    /// `message-id`/`references` of the prior message when this is a
    /// follow-up on an existing thread (spec §4.12 email threading).
    pub in_reply_to: Option<String>,
    pub personalization_refs: Vec<String>,
}

/// Outcome of a single `send` call (spec §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SendOutcome {
    /// Accepted by the provider.
    Ok {
        /// Provider-assigned message/call/action identifier.
        provider_msg_id: String,
    },
    /// A retryable failure (provider 5xx, timeout, ...).
    TransientErr {
        /// Human-readable detail for the activity log.
        detail: String,
    },
    /// A non-retryable failure (provider 4xx, invalid address, ...).
    PermanentErr {
        /// Human-readable detail for the activity log.
        detail: String,
    },
    /// SMS-only: rejected by a do-not-call registry check performed inside
    /// the driver, distinct from a JIT rejection (spec §4.12).
    RejectedDncr {
        /// Human-readable detail for the activity log.
        detail: String,
    },
}

/// Canonical inbound message produced by `ingest`, independent of the
/// originating channel (spec §4.12, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalInboundMessage {
    pub channel: ChannelKind,
    pub provider_thread_ref: String,
    pub provider_msg_id: Option<String>,
    pub from_address: String,
    pub body: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub raw_event_kind: String,
}

/// Errors a driver can raise outside the `send`/`ingest` result types
/// themselves (malformed payloads, provider-side transport failures that
/// never reach the provider).
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("webhook payload could not be parsed: {0}")]
    MalformedPayload(String),
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("webhook event ignored: {0}")]
    Ignored(String),
}

/// The uniform contract every channel driver implements (spec §4.12).
#[async_trait]
pub trait ChannelDriver: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError>;

    /// Parses a provider webhook payload into a canonical inbound message, or
    /// `Ok(None)` when the event carries no actionable inbound message (e.g. a
    /// delivery receipt, spec §4.12).
    async fn ingest(
        &self,
        webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError>;

    /// Polls the provider directly for inbound messages since `since`; the
    /// recovery job's safety net for webhooks the platform never received
    /// (spec §4.9). Drivers without a polling API return an empty list.
    async fn poll_since(
        &self,
        _since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<CanonicalInboundMessage>, ChannelError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_kind_as_str_matches_serde_rename() {
        assert_eq!(ChannelKind::Email.as_str(), "email");
        assert_eq!(ChannelKind::LinkedIn.as_str(), "linkedin");
    }
}
