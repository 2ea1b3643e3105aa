//! Resource Pool — selects the next sender identity for a send, round-robin
//! by least-recently-used (spec §4.4).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::channels::ChannelKind;
use crate::engines::rate_ledger::{RateLedger, ReserveOutcome};
use crate::types::ids::{ResourceId, TenantId};
use crate::types::resource::{Resource, ResourceHealth, ResourceType};

/// The Resource Pool (spec §4.4).
#[derive(Clone)]
pub struct ResourcePool {
    db: SqlitePool,
    rate_ledger: RateLedger,
}

fn resource_type_for_channel(channel: ChannelKind) -> &'static [&'static str] {
    match channel {
        ChannelKind::Email => &["email_domain"],
        ChannelKind::Sms => &["phone_number_sms"],
        ChannelKind::Voice => &["phone_number_voice"],
        ChannelKind::LinkedIn => &["linkedin_seat"],
        ChannelKind::Mail => &["mail_sender"],
    }
}

impl ResourcePool {
    pub fn new(db: SqlitePool, rate_ledger: RateLedger) -> Self {
        Self { db, rate_ledger }
    }

    /// Selects a resource for `channel` available to `tenant_id` with
    /// remaining quota, preferring the least-recently-used (spec §4.4).
    ///
    /// Does not itself reserve quota — callers (the JIT Validator) perform
    /// the reserve once a resource is chosen, since the choice and the
    /// reserve are sequential steps in the same caller-held retry loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub async fn select(
        &self,
        channel: ChannelKind,
        tenant_id: TenantId,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<Resource>, sqlx::Error> {
        let candidates = self.candidates(channel, tenant_id).await?;

        for candidate in candidates {
            let cap = candidate.effective_cap(now);
            if cap == 0 {
                continue;
            }
            match self.rate_ledger.current_usage(candidate.id, now).await? {
                used if used < cap => return Ok(Some(candidate)),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Attempts to select a resource and reserve one unit of its quota in a
    /// single step, retrying the next-best candidate if the reserve loses a
    /// race to a concurrent worker (spec §4.4, §5 concurrency note).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub async fn select_and_reserve(
        &self,
        channel: ChannelKind,
        tenant_id: TenantId,
        now: chrono::DateTime<Utc>,
    ) -> Result<Option<(Resource, u32)>, sqlx::Error> {
        let candidates = self.candidates(channel, tenant_id).await?;

        for candidate in candidates {
            let cap = candidate.effective_cap(now);
            if cap == 0 {
                continue;
            }
            match self.rate_ledger.try_reserve(candidate.id, cap, now).await? {
                ReserveOutcome::Ok { remaining } => return Ok(Some((candidate, remaining))),
                ReserveOutcome::Exhausted => continue,
            }
        }
        Ok(None)
    }

    async fn candidates(
        &self,
        channel: ChannelKind,
        tenant_id: TenantId,
    ) -> Result<Vec<Resource>, sqlx::Error> {
        let types = resource_type_for_channel(channel);
        let rows: Vec<ResourceRow> = sqlx::query_as(
            "SELECT id, resource_type, provider_id, health, last_used_at, usage_count, \
                    daily_cap, leased_to, warming_since, created_at, updated_at \
             FROM resources \
             WHERE resource_type = ?1 AND health IN ('warming', 'healthy') \
               AND (leased_to IS NULL OR leased_to = ?2) \
               AND deleted_at IS NULL \
             ORDER BY last_used_at IS NOT NULL, last_used_at ASC, id ASC",
        )
        .bind(types[0])
        .bind(tenant_id.to_string())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Releases a reserve taken by `select_and_reserve` when dispatch fails
    /// before the driver completes (spec §4.2, §4.8 step 13).
    pub async fn release(&self, resource_id: ResourceId, now: chrono::DateTime<Utc>) {
        self.rate_ledger.release(resource_id, now).await;
    }

    /// Marks a resource as used after a successful dispatch (spec §4.4);
    /// best-effort, staleness by a few seconds is acceptable (spec §5).
    pub async fn mark_used(&self, resource_id: ResourceId, now: chrono::DateTime<Utc>) {
        let _ = sqlx::query(
            "UPDATE resources SET last_used_at = ?1, usage_count = usage_count + 1, updated_at = ?1 \
             WHERE id = ?2",
        )
        .bind(now)
        .bind(resource_id.to_string())
        .execute(&self.db)
        .await;
    }
}

#[allow(clippy::type_complexity)]
type ResourceRow = (
    String,
    String,
    String,
    String,
    Option<chrono::DateTime<Utc>>,
    i64,
    i64,
    Option<String>,
    Option<chrono::DateTime<Utc>>,
    chrono::DateTime<Utc>,
    chrono::DateTime<Utc>,
);

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        let (
            id,
            resource_type,
            provider_id,
            health,
            last_used_at,
            usage_count,
            daily_cap,
            leased_to,
            warming_since,
            created_at,
            updated_at,
        ) = row;

        Self {
            id: id.parse().unwrap_or_default(),
            resource_type: parse_resource_type(&resource_type),
            provider_id,
            health: parse_health(&health),
            last_used_at,
            #[allow(clippy::cast_sign_loss)]
            usage_count: usage_count.max(0) as u64,
            #[allow(clippy::cast_sign_loss)]
            daily_cap: daily_cap.max(0) as u32,
            leased_to: leased_to.and_then(|t| t.parse().ok()),
            warming_since,
            created_at,
            updated_at,
            deleted_at: None,
        }
    }
}

fn parse_resource_type(s: &str) -> ResourceType {
    match s {
        "phone_number_sms" => ResourceType::PhoneNumberSms,
        "phone_number_voice" => ResourceType::PhoneNumberVoice,
        "linkedin_seat" => ResourceType::LinkedinSeat,
        "mail_sender" => ResourceType::MailSender,
        _ => ResourceType::EmailDomain,
    }
}

fn parse_health(s: &str) -> ResourceHealth {
    match s {
        "healthy" => ResourceHealth::Healthy,
        "degraded" => ResourceHealth::Degraded,
        "quarantined" => ResourceHealth::Quarantined,
        _ => ResourceHealth::Warming,
    }
}
