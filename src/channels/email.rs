//! Email channel driver (spec §4.12): threading via in-reply-to/references,
//! delivery/open/click/bounce/reply events surfaced through `ingest`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    CanonicalInboundMessage, ChannelDriver, ChannelError, ChannelKind, OutboundContent,
    SendOutcome,
};
use crate::channels::test_mode::TestModeState;
use crate::types::resource::Resource;

/// Minimal shape of the inbound ESP webhook this driver accepts. Real
/// providers (SendGrid, Postmark, ...) vary; this is the normalized
/// intermediate the platform was retrieved against.
#[derive(Debug, Deserialize)]
struct EspEvent {
    event: String,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    in_reply_to: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub struct EmailDriver {
    http: reqwest::Client,
    test_mode: Arc<TestModeState>,
}

impl EmailDriver {
    pub fn new(http: reqwest::Client, test_mode: Arc<TestModeState>) -> Self {
        Self { http, test_mode }
    }
}

#[async_trait]
impl ChannelDriver for EmailDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        let Some(target) = self.test_mode.redirect(ChannelKind::Email, address) else {
            return Ok(SendOutcome::PermanentErr {
                detail: "test mode daily cap exhausted".to_owned(),
            });
        };

        let mut payload = serde_json::json!({
            "from": resource.provider_id,
            "to": target,
            "subject": content.subject,
            "body": content.body,
        });
        if let Some(in_reply_to) = &content.in_reply_to {
            payload["in_reply_to"] = serde_json::Value::String(in_reply_to.clone());
            payload["references"] = serde_json::Value::String(in_reply_to.clone());
        }

        let response = self
            .http
            .post("https://esp.invalid/v1/messages")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(Deserialize)]
                struct Accepted {
                    message_id: String,
                }
                let body: Accepted = resp
                    .json()
                    .await
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                Ok(SendOutcome::Ok { provider_msg_id: body.message_id })
            }
            Ok(resp) if resp.status().is_client_error() => Ok(SendOutcome::PermanentErr {
                detail: format!("esp rejected send: {}", resp.status()),
            }),
            Ok(resp) => Ok(SendOutcome::TransientErr {
                detail: format!("esp transient failure: {}", resp.status()),
            }),
            Err(e) => Ok(SendOutcome::TransientErr { detail: e.to_string() }),
        }
    }

    async fn ingest(
        &self,
        webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        let event: EspEvent = serde_json::from_value(webhook_payload.clone())
            .map_err(|e| ChannelError::MalformedPayload(e.to_string()))?;

        if event.event != "reply" {
            return Ok(None);
        }

        let from = event
            .from
            .ok_or_else(|| ChannelError::MalformedPayload("reply missing from".to_owned()))?;
        let thread_ref = event.in_reply_to.clone().unwrap_or_default();

        Ok(Some(CanonicalInboundMessage {
            channel: ChannelKind::Email,
            provider_thread_ref: thread_ref,
            provider_msg_id: event.message_id,
            from_address: from,
            body: event.text.unwrap_or_default(),
            received_at: chrono::Utc::now(),
            raw_event_kind: event.event,
        }))
    }
}
