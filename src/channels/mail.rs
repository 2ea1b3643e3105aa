//! Physical mail channel driver (spec §4.12): fire-and-forget dispatch, no
//! delivery events — `ingest` always returns `Ok(None)`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    CanonicalInboundMessage, ChannelDriver, ChannelError, ChannelKind, OutboundContent,
    SendOutcome,
};
use crate::channels::test_mode::TestModeState;
use crate::types::resource::Resource;

pub struct MailDriver {
    http: reqwest::Client,
    test_mode: Arc<TestModeState>,
}

impl MailDriver {
    pub fn new(http: reqwest::Client, test_mode: Arc<TestModeState>) -> Self {
        Self { http, test_mode }
    }
}

#[async_trait]
impl ChannelDriver for MailDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Mail
    }

    async fn send(
        &self,
        resource: &Resource,
        address: &str,
        content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        let Some(target) = self.test_mode.redirect(ChannelKind::Mail, address) else {
            return Ok(SendOutcome::PermanentErr {
                detail: "test mode daily cap exhausted".to_owned(),
            });
        };

        let payload = serde_json::json!({
            "sender": resource.provider_id,
            "mailing_address": target,
            "body": content.body,
        });

        let response = self
            .http
            .post("https://mail-fulfillment.invalid/v1/orders")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                #[derive(Deserialize)]
                struct Accepted {
                    order_id: String,
                }
                let body: Accepted = resp
                    .json()
                    .await
                    .map_err(|e| ChannelError::Transport(e.to_string()))?;
                Ok(SendOutcome::Ok { provider_msg_id: body.order_id })
            }
            Ok(resp) if resp.status().is_client_error() => Ok(SendOutcome::PermanentErr {
                detail: format!("mail fulfillment rejected order: {}", resp.status()),
            }),
            Ok(resp) => Ok(SendOutcome::TransientErr {
                detail: format!("mail fulfillment transient failure: {}", resp.status()),
            }),
            Err(e) => Ok(SendOutcome::TransientErr { detail: e.to_string() }),
        }
    }

    async fn ingest(
        &self,
        _webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        Ok(None)
    }
}
