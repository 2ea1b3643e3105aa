//! SMS channel driver (spec §4.12): do-not-call registry check happens
//! inside the driver (requires a provider lookup), distinct from the JIT
//! validator's own checks.

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
struct SmsEvent {
    event: String,
    #[serde(default)]
    message_sid: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

pub struct SmsDriver {
    http: reqwest::Client,
    test_mode: Arc<TestModeState>,
}

impl SmsDriver {
    pub fn new(http: reqwest::Client, test_mode: Arc<TestModeState>) -> Self {
        Self { http, test_mode }
    }

    async fn is_on_dncr(&self, address: &str) -> Result<bool, ChannelError> {
        let response = self
            .http
            .get("https://dncr.invalid/v1/check")
            .query(&[("number", address)])
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        #[derive(Deserialize)]
        struct DncrLookup {
            listed: bool,
        }
        let lookup: DncrLookup = response
            .json()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        Ok(lookup.listed)
    }
}

#[async_trait]
impl ChannelDriver for SmsDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        if self.is_on_dncr(address).await? {
            return Ok(SendOutcome::RejectedDncr {
                detail: "number matched do-not-call registry".to_owned(),
            });
        }

        let Some(target) = self.test_mode.redirect(ChannelKind::Sms, address) else {
            return Ok(SendOutcome::PermanentErr {
                detail: "test mode daily cap exhausted".to_owned(),
            });
        };

        let payload = serde_json::json!({
            "from": resource.provider_id,
            "to": target,
            "body": content.body,
        });

        let response = self
            .http
            .post("https://sms.invalid/v1/messages")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(Deserialize)]
                struct Accepted {
                    sid: String,
                }
                let body: Accepted = resp
                    .json()
                    .await
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                Ok(SendOutcome::Ok { provider_msg_id: body.sid })
            }
            Ok(resp) if resp.status().is_client_error() => Ok(SendOutcome::PermanentErr {
                detail: format!("sms provider rejected send: {}", resp.status()),
            }),
            Ok(resp) => Ok(SendOutcome::TransientErr {
                detail: format!("sms provider transient failure: {}", resp.status()),
            }),
            Err(e) => Ok(SendOutcome::TransientErr { detail: e.to_string() }),
        }
    }

    async fn ingest(
        &self,
        webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        let event: SmsEvent = serde_json::from_value(webhook_payload.clone())
            .map_err(|e| ChannelError::MalformedPayload(e.to_string()))?;

        if event.event != "inbound_message" {
            return Ok(None);
        }

        let from = event
            .from
            .ok_or_else(|| ChannelError::MalformedPayload("inbound sms missing from".to_owned()))?;

        Ok(Some(CanonicalInboundMessage {
            channel: ChannelKind::Sms,
            provider_thread_ref: from.clone(),
            provider_msg_id: event.message_sid,
            from_address: from,
            body: event.body.unwrap_or_default(),
            received_at: chrono::Utc::now(),
            raw_event_kind: event.event,
        }))
    }
}
