//! Allocation Job — periodic top-up of each active tenant's active pipeline
//! via the Lead Pool & Allocator's `monthly_replenishment` (spec §4.6).

use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::engines::allocator::Allocator;
use crate::types::campaign::{Campaign, CampaignStatus};
use crate::types::ids::{CampaignId, TenantId};
use crate::types::tenant::{IcpVector, PermissionMode, SubscriptionState, Tenant, TenantTier};

/// Counts produced by one allocation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllocationCounts {
    pub tenants_considered: u32,
    pub assignments_created: u32,
}

/// Runs `monthly_replenishment` for every tenant with an active subscription
/// and at least one active campaign (spec §4.6: "only active campaigns
/// receive new leads").
///
/// # Errors
///
/// Returns an error if the tenant/campaign query fails. Per-tenant
/// replenishment failures never abort the batch.
pub async fn run_once(db: &SqlitePool, allocator: &Allocator) -> Result<AllocationCounts, sqlx::Error> {
    let tenants = active_tenants_with_campaign(db).await?;
    let mut counts = AllocationCounts::default();

    for (tenant, campaign) in tenants {
        counts.tenants_considered += 1;
        match allocator.monthly_replenishment(&tenant, &campaign, tenant.tier).await {
            Ok(created) => {
                #[allow(clippy::cast_possible_truncation)]
                {
                    counts.assignments_created += created.len() as u32;
                }
            }
            Err(err) => {
                error!(tenant_id = %tenant.id, %err, "replenishment failed for tenant");
            }
        }
    }

    Ok(counts)
}

async fn active_tenants_with_campaign(
    db: &SqlitePool,
) -> Result<Vec<(Tenant, Campaign)>, sqlx::Error> {
    let rows: Vec<TenantCampaignRow> = sqlx::query_as(
        "SELECT t.id, t.display_name, t.tier, t.subscription_state, t.credits_remaining, \
                t.permission_mode, t.icp_json, t.webhook_url, t.webhook_failure_streak, \
                t.onboarded_at, t.created_at, t.updated_at, \
                c.id, c.name, c.status, c.permission_mode, c.lead_quota, c.sequence_json, \
                c.created_at, c.updated_at \
         FROM tenants t \
         JOIN campaigns c ON c.tenant_id = t.id AND c.deleted_at IS NULL AND c.status = 'active' \
         WHERE t.deleted_at IS NULL AND t.subscription_state IN ('active', 'trialing') \
         GROUP BY t.id",
    )
    .fetch_all(db)
    .await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(pair) = row.into_pair() else {
            warn!("allocation job: skipped a tenant/campaign row with an unparseable id");
            continue;
        };
        out.push(pair);
    }
    Ok(out)
}

#[derive(sqlx::FromRow)]
struct TenantCampaignRow {
    tenant_id: String,
    display_name: String,
    tier: String,
    subscription_state: String,
    credits_remaining: i64,
    permission_mode: String,
    icp_json: String,
    webhook_url: Option<String>,
    webhook_failure_streak: i64,
    onboarded_at: chrono::DateTime<chrono::Utc>,
    tenant_created_at: chrono::DateTime<chrono::Utc>,
    tenant_updated_at: chrono::DateTime<chrono::Utc>,
    campaign_id: String,
    name: String,
    status: String,
    campaign_permission_mode: String,
    lead_quota: i64,
    sequence_json: String,
    campaign_created_at: chrono::DateTime<chrono::Utc>,
    campaign_updated_at: chrono::DateTime<chrono::Utc>,
}

impl TenantCampaignRow {
    fn into_pair(self) -> Option<(Tenant, Campaign)> {
        let tenant_id: TenantId = self.tenant_id.parse().ok()?;
        let campaign_id: CampaignId = self.campaign_id.parse().ok()?;
        let icp: IcpVector = serde_json::from_str(&self.icp_json).unwrap_or_default();
        let sequence = serde_json::from_str(&self.sequence_json).unwrap_or_default();

        let tenant = Tenant {
            id: tenant_id,
            display_name: self.display_name,
            tier: parse_tier(&self.tier),
            subscription_state: parse_subscription_state(&self.subscription_state),
            credits_remaining: self.credits_remaining,
            permission_mode: parse_permission_mode(&self.permission_mode),
            icp,
            webhook_url: self.webhook_url,
            #[allow(clippy::cast_sign_loss)]
            webhook_failure_streak: self.webhook_failure_streak.max(0) as u32,
            onboarded_at: self.onboarded_at,
            created_at: self.tenant_created_at,
            updated_at: self.tenant_updated_at,
            deleted_at: None,
        };

        let campaign = Campaign {
            id: campaign_id,
            tenant_id,
            name: self.name,
            status: parse_campaign_status(&self.status),
            channel_allocation: Vec::new(),
            permission_mode: parse_permission_mode(&self.campaign_permission_mode),
            #[allow(clippy::cast_sign_loss)]
            lead_quota: self.lead_quota.max(0) as u32,
            sequence,
            send_window: crate::types::campaign::SendWindow::default(),
            created_at: self.campaign_created_at,
            updated_at: self.campaign_updated_at,
            deleted_at: None,
        };

        Some((tenant, campaign))
    }
}

fn parse_tier(s: &str) -> TenantTier {
    match s {
        "growth" => TenantTier::Growth,
        "scale" => TenantTier::Scale,
        _ => TenantTier::Starter,
    }
}

fn parse_subscription_state(s: &str) -> SubscriptionState {
    match s {
        "past_due" => SubscriptionState::PastDue,
        "paused" => SubscriptionState::Paused,
        "cancelled" => SubscriptionState::Cancelled,
        "active" => SubscriptionState::Active,
        _ => SubscriptionState::Trialing,
    }
}

fn parse_permission_mode(s: &str) -> PermissionMode {
    match s {
        "co_pilot" => PermissionMode::CoPilot,
        "manual" => PermissionMode::Manual,
        _ => PermissionMode::Autopilot,
    }
}

fn parse_campaign_status(s: &str) -> CampaignStatus {
    match s {
        "active" => CampaignStatus::Active,
        "paused" => CampaignStatus::Paused,
        "completed" => CampaignStatus::Completed,
        _ => CampaignStatus::Draft,
    }
}
