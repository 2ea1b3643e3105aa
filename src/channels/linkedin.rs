//! LinkedIn channel driver (spec §4.12): connection requests and direct
//! messages are distinct actions against the same resource's daily cap.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    CanonicalInboundMessage, ChannelDriver, ChannelError, ChannelKind, OutboundContent,
    SendOutcome,
};
use crate::channels::test_mode::TestModeState;
use crate::types::resource::Resource;

#[derive(Debug, Deserialize)]
struct LinkedinEvent {
    event: String,
    #[serde(default)]
    conversation_urn: Option<String>,
    #[serde(default)]
    message_urn: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

pub struct LinkedinDriver {
    http: reqwest::Client,
    test_mode: Arc<TestModeState>,
}

impl LinkedinDriver {
    pub fn new(http: reqwest::Client, test_mode: Arc<TestModeState>) -> Self {
        Self { http, test_mode }
    }
}

#[async_trait]
impl ChannelDriver for LinkedinDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::LinkedIn
    }

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        let Some(target) = self.test_mode.redirect(ChannelKind::LinkedIn, address) else {
            return Ok(SendOutcome::PermanentErr {
                detail: "test mode daily cap exhausted".to_owned(),
            });
        };

        // First sequence touch is a connection request; subsequent touches on
        // an accepted connection are direct messages. The caller threads that
        // distinction through `in_reply_to`: present means "message", absent
        // means "connection request" (both draw from the same daily cap).
        let action = if content.in_reply_to.is_some() { "message" } else { "connect" };

        let payload = serde_json::json!({
            "seat": resource.provider_id,
            "profile": target,
            "action": action,
            "note": content.body,
        });

        let response = self
            .http
            .post("https://linkedin-automation.invalid/v1/actions")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(Deserialize)]
                struct Accepted {
                    action_urn: String,
                }
                let body: Accepted = resp
                    .json()
                    .await
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                Ok(SendOutcome::Ok { provider_msg_id: body.action_urn })
            }
            Ok(resp) if resp.status().is_client_error() => Ok(SendOutcome::PermanentErr {
                detail: format!("linkedin provider rejected action: {}", resp.status()),
            }),
            Ok(resp) => Ok(SendOutcome::TransientErr {
                detail: format!("linkedin provider transient failure: {}", resp.status()),
            }),
            Err(e) => Ok(SendOutcome::TransientErr { detail: e.to_string() }),
        }
    }

    async fn ingest(
        &self,
        webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        let event: LinkedinEvent = serde_json::from_value(webhook_payload.clone())
            .map_err(|e| ChannelError::MalformedPayload(e.to_string()))?;

        if event.event != "message_received" && event.event != "connection_accepted" {
            return Ok(None);
        }

        let from = event
            .from
            .ok_or_else(|| ChannelError::MalformedPayload("linkedin event missing from".to_owned()))?;
        let thread_ref = event.conversation_urn.clone().unwrap_or_else(|| from.clone());

        Ok(Some(CanonicalInboundMessage {
            channel: ChannelKind::LinkedIn,
            provider_thread_ref: thread_ref,
            provider_msg_id: event.message_urn,
            from_address: from,
            body: event.text.unwrap_or_default(),
            received_at: chrono::Utc::now(),
            raw_event_kind: event.event,
        }))
    }
}
