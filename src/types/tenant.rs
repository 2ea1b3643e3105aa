//! Tenant — a client of the platform (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TenantId;

/// Capacity tier a tenant is subscribed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum TenantTier {
    /// Entry-level capacity.
    Starter,
    /// Mid-tier capacity.
    Growth,
    /// Top-tier capacity.
    Scale,
}

impl TenantTier {
    /// Monthly active-pipeline quota used by replenishment (spec §4.6).
    pub fn monthly_lead_quota(self) -> u32 {
        match self {
            Self::Starter => 200,
            Self::Growth => 750,
            Self::Scale => 2500,
        }
    }
}

/// Subscription lifecycle state (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SubscriptionState {
    /// In the free trial period.
    Trialing,
    /// Paying and current.
    Active,
    /// Payment failed; grace period before `paused`.
    PastDue,
    /// Subscription paused by the tenant or billing.
    Paused,
    /// Subscription terminated.
    Cancelled,
}

impl SubscriptionState {
    /// Whether outreach may be dispatched while in this state (JIT check #2, spec §4.8).
    pub fn permits_send(self) -> bool {
        matches!(self, Self::Trialing | Self::Active)
    }
}

/// How much autonomy the tenant has granted the platform over a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PermissionMode {
    /// Platform sends without per-message review.
    Autopilot,
    /// Platform drafts, a human approves before send.
    CoPilot,
    /// Platform never sends automatically.
    Manual,
}

/// Per-tenant ideal-customer-profile vector (spec §3).
///
/// `weight_overrides` lets a tenant override a learned or platform-prior
/// scoring weight for a named feature (spec §4.7); absent keys fall back to
/// [`crate::engines::scorer`] defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IcpVector {
    pub industries: Vec<String>,
    pub titles: Vec<String>,
    pub company_sizes: Vec<String>,
    pub locations: Vec<String>,
    pub pain_points: Vec<String>,
    #[serde(default)]
    pub weight_overrides: std::collections::HashMap<String, f64>,
}

/// A client of the platform (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub display_name: String,
    pub tier: TenantTier,
    pub subscription_state: SubscriptionState,
    pub credits_remaining: i64,
    pub permission_mode: PermissionMode,
    pub icp: IcpVector,
    /// Outbound webhook endpoint for meeting-booked pushes (spec §6.3); `None`
    /// disables the push.
    pub webhook_url: Option<String>,
    /// Consecutive outbound webhook failures; used to mark the endpoint degraded (spec §6.3).
    pub webhook_failure_streak: u32,
    pub onboarded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Days since onboarding — consulted by the JIT warmup gate (spec §4.8 step 12).
    pub fn days_onboarded(&self, now: DateTime<Utc>) -> i64 {
        (now - self.onboarded_at).num_days().max(0)
    }

    /// Whether this tenant has credits left to spend on a send (JIT check #3).
    pub fn has_credits(&self) -> bool {
        self.credits_remaining > 0
    }
}
