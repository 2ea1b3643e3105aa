//! Inbound webhook ingress (spec §6.2): delegates payload parsing to the
//! matching channel driver, then routes the canonical result through the
//! Reply Router. The Router itself enforces idempotency on `provider_msg_id`.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::channels::{ChannelDriver, ChannelError, ChannelKind};
use crate::orchestration::reply_router::{ReplyRouter, RouteOutcome};
use crate::orchestration::reply_router::InboundPayload;

/// Errors surfaced by [`handle`] distinct from a successful no-op.
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("no driver registered for channel")]
    UnknownChannel,
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("routing failed: {0}")]
    Route(#[source] sqlx::Error),
}

/// Accepts one provider webhook delivery end to end (spec §6.2).
///
/// Returns `Ok(None)` when the driver determines the event carries no
/// actionable inbound message (delivery receipts, events it ignores) — this
/// is the normal, frequent case, not an error.
///
/// # Errors
///
/// Returns an error if no driver is registered for `channel`, the driver
/// rejects the payload as malformed, or routing itself fails.
pub async fn handle(
    drivers: &HashMap<ChannelKind, Arc<dyn ChannelDriver>>,
    reply_router: &ReplyRouter,
    channel: ChannelKind,
    send_window_active: bool,
    payload: &serde_json::Value,
) -> Result<Option<RouteOutcome>, IngressError> {
    let driver = drivers.get(&channel).ok_or(IngressError::UnknownChannel)?;

    let canonical = match driver.ingest(payload).await {
        Ok(Some(message)) => message,
        Ok(None) => return Ok(None),
        Err(ChannelError::Ignored(reason)) => {
            warn!(channel = channel.as_str(), %reason, "inbound webhook ignored");
            return Ok(None);
        }
        Err(err) => return Err(IngressError::Channel(err)),
    };

    let Some(provider_msg_id) = canonical.provider_msg_id else {
        warn!(channel = channel.as_str(), "inbound webhook carried no provider message id, dropped");
        return Ok(None);
    };

    let inbound = InboundPayload {
        tenant_id: None,
        lead_key: canonical.from_address,
        channel: canonical.channel,
        content: canonical.body,
        subject: None,
        thread_key: Some(canonical.provider_thread_ref),
        provider_msg_id,
        timestamp: canonical.received_at,
    };

    let outcome = reply_router
        .route(inbound, send_window_active)
        .await
        .map_err(IngressError::Route)?;
    Ok(Some(outcome))
}
