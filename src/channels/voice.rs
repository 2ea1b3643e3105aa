//! Voice channel driver (spec §4.12): synthesizes a call plan from the Lead
//! Pool record's knowledge base and objection handlers; durations and
//! outcomes are recorded post-call via `ingest`.

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
struct CallCompletedEvent {
    event: String,
    #[serde(default)]
    call_sid: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

pub struct VoiceDriver {
    http: reqwest::Client,
    test_mode: Arc<TestModeState>,
}

impl VoiceDriver {
    pub fn new(http: reqwest::Client, test_mode: Arc<TestModeState>) -> Self {
        Self { http, test_mode }
    }
}

#[async_trait]
impl ChannelDriver for VoiceDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Voice
    }

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        let Some(target) = self.test_mode.redirect(ChannelKind::Voice, address) else {
            return Ok(SendOutcome::PermanentErr {
                detail: "test mode daily cap exhausted".to_owned(),
            });
        };

        // `content.body` carries the call plan (knowledge base + objection
        // handlers) assembled upstream; this driver only places the call.
        let payload = serde_json::json!({
            "from": resource.provider_id,
            "to": target,
            "call_plan": content.body,
        });

        let response = self
            .http
            .post("https://voice.invalid/v1/calls")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(Deserialize)]
                struct Accepted {
                    call_sid: String,
                }
                let body: Accepted = resp
                    .json()
                    .await
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                Ok(SendOutcome::Ok { provider_msg_id: body.call_sid })
            }
            Ok(resp) if resp.status().is_client_error() => Ok(SendOutcome::PermanentErr {
                detail: format!("voice provider rejected call: {}", resp.status()),
            }),
            Ok(resp) => Ok(SendOutcome::TransientErr {
                detail: format!("voice provider transient failure: {}", resp.status()),
            }),
            Err(e) => Ok(SendOutcome::TransientErr { detail: e.to_string() }),
        }
    }

    async fn ingest(
        &self,
        webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        let event: CallCompletedEvent = serde_json::from_value(webhook_payload.clone())
            .map_err(|e| ChannelError::MalformedPayload(e.to_string()))?;

        if event.event != "call_completed" {
            return Ok(None);
        }

        let Some(transcript) = event.transcript else {
            return Err(ChannelError::Ignored("call completed with no transcript".to_owned()));
        };
        let from = event
            .from
            .ok_or_else(|| ChannelError::MalformedPayload("call event missing from".to_owned()))?;

        Ok(Some(CanonicalInboundMessage {
            channel: ChannelKind::Voice,
            provider_thread_ref: from.clone(),
            provider_msg_id: event.call_sid,
            from_address: from,
            body: transcript,
            received_at: chrono::Utc::now(),
            raw_event_kind: event.event,
        }))
    }
}
