//! JIT Validator — the last gate before a send, re-checked per candidate
//! (assignment, channel, now) rather than once per batch (spec §4.8).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::channels::ChannelKind;
use crate::engines::resource_pool::ResourcePool;
use crate::engines::suppression::{SuppressionCheck, SuppressionIndex};
use crate::error::{DispatchError, JitRejectReason};
use crate::types::assignment::Assignment;
use crate::types::campaign::{Campaign, CampaignStatus};
use crate::types::lead::LeadPoolRecord;
use crate::types::resource::Resource;
use crate::types::suppression::SuppressionKey;
use crate::types::tenant::{PermissionMode, Tenant};

/// Tunables consulted by steps 9–12 (spec §4.8, §6.1); mirrors
/// [`crate::config::JitConfig`] plus the channel ALS gates from
/// [`crate::config::ScoringConfig`].
#[derive(Debug, Clone, Copy)]
pub struct JitThresholds {
    pub min_touch_gap_days: i64,
    pub channel_cooldown_days: i64,
    pub email_warmup_days: i64,
    pub voice_min_als: u32,
    pub mail_min_als: u32,
}

/// Result of a JIT validation pass (spec §4.8).
pub enum JitOutcome {
    /// All thirteen checks passed; `resource` already has its quota reserved
    /// and must be released by the caller if dispatch fails before send.
    Allow { resource: Resource },
    /// Short-circuited on the named check.
    Reject(JitRejectReason),
}

/// The JIT Validator (spec §4.8).
pub struct JitValidator {
    db: SqlitePool,
    suppression: SuppressionIndex,
    resource_pool: ResourcePool,
    thresholds: JitThresholds,
}

impl JitValidator {
    pub fn new(
        db: SqlitePool,
        suppression: SuppressionIndex,
        resource_pool: ResourcePool,
        thresholds: JitThresholds,
    ) -> Self {
        Self { db, suppression, resource_pool, thresholds }
    }

    /// Runs the thirteen ordered checks against a candidate send, returning
    /// on the first failure (spec §4.8).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Fatal`] if invoked on an assignment the
    /// Scheduler should never have queued (step 1 — the scheduler's own
    /// candidate query is expected to pre-filter on sendable status), or
    /// [`DispatchError::Database`] if a query backing one of the checks
    /// fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn validate(
        &self,
        assignment: &Assignment,
        lead: &LeadPoolRecord,
        tenant: &Tenant,
        campaign: &Campaign,
        channel: ChannelKind,
        als_score: u32,
        followup_armed: bool,
        now: DateTime<Utc>,
    ) -> Result<JitOutcome, DispatchError> {
        // 1. Assignment local status.
        if !assignment.is_sendable_status(followup_armed) {
            return Err(DispatchError::Fatal(format!(
                "jit validator invoked on non-sendable assignment {}",
                assignment.id
            )));
        }

        // 2. Tenant subscription state.
        if !tenant.subscription_state.permits_send() {
            return Ok(JitOutcome::Reject(JitRejectReason::SubscriptionInactive));
        }

        // 3. Tenant credits.
        if !tenant.has_credits() {
            return Ok(JitOutcome::Reject(JitRejectReason::NoCredits));
        }

        // 4. Campaign status.
        if campaign.status != CampaignStatus::Active {
            return Ok(JitOutcome::Reject(JitRejectReason::CampaignInactive));
        }

        // 5. Campaign permission mode.
        if campaign.permission_mode == PermissionMode::Manual {
            return Ok(JitOutcome::Reject(JitRejectReason::ManualMode));
        }

        // 6. Lead global block flags.
        if lead.bounced {
            return Ok(JitOutcome::Reject(JitRejectReason::BouncedGlobally));
        }
        if lead.unsubscribed {
            return Ok(JitOutcome::Reject(JitRejectReason::UnsubscribedGlobally));
        }

        // 7. Suppression list (global, tenant, domain).
        if let Some(email) = lead.identity.email.as_deref() {
            match self.suppression.is_suppressed(tenant.id, SuppressionKey::Email, email).await {
                SuppressionCheck::Blocked { scope, .. } => {
                    return Ok(JitOutcome::Reject(suppression_reject_reason(scope)));
                }
                SuppressionCheck::Clear => {}
            }
            if let Some(domain) = email_domain(email) {
                match self.suppression.is_suppressed(tenant.id, SuppressionKey::Domain, &domain).await {
                    SuppressionCheck::Blocked { .. } => {
                        return Ok(JitOutcome::Reject(JitRejectReason::SuppressedDomain));
                    }
                    SuppressionCheck::Clear => {}
                }
            }
        }

        // 8. Email deliverability status (email channel only).
        if channel == ChannelKind::Email {
            if let Some(status) = lead.email_status {
                if !status.permits_send() {
                    return Ok(JitOutcome::Reject(JitRejectReason::EmailInvalid));
                }
            }
        }

        // 9. Minimum touch gap across any channel.
        if let Some(last) = self.last_activity_at(assignment.lead_id, None).await? {
            if (now - last).num_days() < self.thresholds.min_touch_gap_days {
                return Ok(JitOutcome::Reject(JitRejectReason::TooRecent));
            }
        }

        // 10. Channel-specific cooldown.
        if let Some(last) = self.last_activity_at(assignment.lead_id, Some(channel)).await? {
            if (now - last).num_days() < self.thresholds.channel_cooldown_days {
                return Ok(JitOutcome::Reject(JitRejectReason::ChannelCooldown));
            }
        }

        // 11. Channel ALS gate.
        let als_floor = match channel {
            ChannelKind::Voice => Some(self.thresholds.voice_min_als),
            ChannelKind::Mail => Some(self.thresholds.mail_min_als),
            _ => None,
        };
        if let Some(floor) = als_floor {
            if als_score < floor {
                return Ok(JitOutcome::Reject(JitRejectReason::AlsTooLow));
            }
        }

        // 12 & 13. Warmup gate and Rate Ledger reserve are resolved together:
        // the Resource Pool hands back the least-recently-used candidate with
        // headroom and its reserve already taken; if that candidate is an
        // email resource still warming and the tenant itself hasn't cleared
        // the warmup window, we reject rather than walk further candidates.
        let Some((resource, _remaining)) =
            self.resource_pool.select_and_reserve(channel, tenant.id, now).await?
        else {
            return Ok(JitOutcome::Reject(JitRejectReason::RateLimitChannel));
        };

        if channel == ChannelKind::Email {
            let tenant_warmed = tenant.days_onboarded(now) >= self.thresholds.email_warmup_days;
            let resource_warmed = resource.health != crate::types::resource::ResourceHealth::Warming;
            if !tenant_warmed && !resource_warmed {
                self.resource_pool.release(resource.id, now).await;
                return Ok(JitOutcome::Reject(JitRejectReason::WarmupNotReady));
            }
        }

        Ok(JitOutcome::Allow { resource })
    }

    async fn last_activity_at(
        &self,
        lead_id: crate::types::ids::LeadId,
        channel: Option<ChannelKind>,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        let row: Option<(DateTime<Utc>,)> = if let Some(channel) = channel {
            sqlx::query_as(
                "SELECT MAX(occurred_at) FROM activities \
                 WHERE lead_id = ?1 AND channel = ?2 AND occurred_at IS NOT NULL",
            )
            .bind(lead_id.to_string())
            .bind(channel.as_str())
            .fetch_optional(&self.db)
            .await?
        } else {
            sqlx::query_as(
                "SELECT MAX(occurred_at) FROM activities \
                 WHERE lead_id = ?1 AND occurred_at IS NOT NULL",
            )
            .bind(lead_id.to_string())
            .fetch_optional(&self.db)
            .await?
        };
        Ok(row.map(|(ts,)| ts))
    }
}

fn suppression_reject_reason(scope: crate::types::suppression::SuppressionScope) -> JitRejectReason {
    use crate::types::suppression::SuppressionScope;
    match scope {
        SuppressionScope::Global => JitRejectReason::SuppressedGlobal,
        SuppressionScope::Tenant => JitRejectReason::SuppressedTenant,
        SuppressionScope::Domain => JitRejectReason::SuppressedDomain,
    }
}

fn email_domain(email: &str) -> Option<String> {
    email.rsplit_once('@').map(|(_, domain)| domain.to_lowercase())
}
