//! Recovery Job — periodic safety net that polls channel providers directly
//! for inbound messages the webhook path never received (spec §4.9).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::channels::{ChannelDriver, ChannelKind};
use crate::orchestration::reply_router::{InboundPayload, ReplyRouter, RouteOutcome};

/// Counts produced by one recovery pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryCounts {
    pub polled: u32,
    pub routed: u32,
    pub duplicate: u32,
    pub lead_not_found: u32,
}

/// The Recovery Job (spec §4.9). Each channel driver is polled independently
/// since its own last-successful checkpoint; drivers with no polling API
/// (the default [`ChannelDriver::poll_since`]) simply contribute nothing.
pub struct RecoveryJob {
    db: SqlitePool,
    drivers: Arc<HashMap<ChannelKind, Arc<dyn ChannelDriver>>>,
    reply_router: Arc<ReplyRouter>,
}

impl RecoveryJob {
    pub fn new(
        db: SqlitePool,
        drivers: Arc<HashMap<ChannelKind, Arc<dyn ChannelDriver>>>,
        reply_router: Arc<ReplyRouter>,
    ) -> Self {
        Self { db, drivers, reply_router }
    }

    /// Polls every registered driver since its last checkpoint and routes
    /// whatever comes back through the Reply Router, then advances the
    /// checkpoint to `now` regardless of per-message outcome — a poll that
    /// ran and found nothing is still progress.
    ///
    /// Replies surfaced this way never had their originating send window
    /// observed, so the conservative (out-of-window) response delay band is
    /// used; see [`crate::orchestration::reply_router::ReplyRouter::route`].
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint table cannot be read or written.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RecoveryCounts, sqlx::Error> {
        let mut counts = RecoveryCounts::default();

        for (&channel, driver) in self.drivers.iter() {
            let since = self.checkpoint(channel).await?;
            let messages = match driver.poll_since(since).await {
                Ok(messages) => messages,
                Err(err) => {
                    error!(channel = channel.as_str(), %err, "recovery poll failed");
                    continue;
                }
            };

            for message in messages {
                counts.polled += 1;
                let Some(provider_msg_id) = message.provider_msg_id else {
                    warn!(channel = channel.as_str(), "recovery: polled message with no provider id, skipped");
                    continue;
                };
                let payload = InboundPayload {
                    tenant_id: None,
                    lead_key: message.from_address,
                    channel: message.channel,
                    content: message.body,
                    subject: None,
                    thread_key: Some(message.provider_thread_ref),
                    provider_msg_id,
                    timestamp: message.received_at,
                };
                match self.reply_router.route(payload, false).await {
                    Ok(RouteOutcome::Duplicate) => counts.duplicate += 1,
                    Ok(RouteOutcome::LeadNotFound) => counts.lead_not_found += 1,
                    Ok(RouteOutcome::Routed { .. }) => counts.routed += 1,
                    Err(err) => error!(channel = channel.as_str(), %err, "recovery: routing failed"),
                }
            }

            self.advance_checkpoint(channel, now).await?;
        }

        Ok(counts)
    }

    async fn checkpoint(&self, channel: ChannelKind) -> Result<DateTime<Utc>, sqlx::Error> {
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            "SELECT last_polled_at FROM recovery_checkpoints WHERE channel = ?1",
        )
        .bind(channel.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map_or_else(|| Utc::now() - chrono::Duration::hours(24), |(ts,)| ts))
    }

    async fn advance_checkpoint(
        &self,
        channel: ChannelKind,
        now: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO recovery_checkpoints (channel, last_polled_at) VALUES (?1, ?2) \
             ON CONFLICT(channel) DO UPDATE SET last_polled_at = excluded.last_polled_at",
        )
        .bind(channel.as_str())
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
