//! Resource — a shared sender identity in the platform fleet (spec §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ResourceId, TenantId};

/// Sender identity type (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ResourceType {
    /// A sending domain for email outreach.
    EmailDomain,
    /// A phone number dedicated to SMS.
    PhoneNumberSms,
    /// A phone number dedicated to voice calls.
    PhoneNumberVoice,
    /// A LinkedIn automation seat.
    LinkedinSeat,
    /// A physical-mail sender identity.
    MailSender,
}

impl ResourceType {
    /// Default daily cap per §4.2 and §6.1.
    pub fn default_daily_cap(self) -> u32 {
        match self {
            Self::EmailDomain => 50,
            Self::PhoneNumberSms => 100,
            Self::PhoneNumberVoice => 50,
            Self::LinkedinSeat => 17,
            Self::MailSender => 1000,
        }
    }
}

/// Resource health state (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ResourceHealth {
    /// Newly onboarded; subject to the ramp schedule (spec §4.4).
    Warming,
    /// Fully available at its configured daily cap.
    Healthy,
    /// Flagged for elevated failure rate; excluded from selection pending
    /// review, short of full quarantine.
    Degraded,
    /// Removed from rotation entirely.
    Quarantined,
}

impl ResourceHealth {
    /// Selectable by the Resource Pool (spec §4.4 filter).
    pub fn is_selectable(self) -> bool {
        matches!(self, Self::Warming | Self::Healthy)
    }
}

/// A sender identity in the shared platform fleet (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub resource_type: ResourceType,
    pub provider_id: String,
    pub health: ResourceHealth,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub daily_cap: u32,
    /// `Some` when exclusively leased to a tenant; `None` when pooled (spec §3).
    pub leased_to: Option<TenantId>,
    /// Day the resource entered `warming`, used to compute the ramp schedule
    /// (spec §4.4).
    pub warming_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Ramp schedule for a resource in `warming` health (spec §4.4): day 1 → 5,
/// day 2 → 10, growing by 5/day thereafter, capped at the resource's
/// configured cap.
pub fn warmup_ramp_cap(configured_cap: u32, days_warming: i64) -> u32 {
    let day = days_warming.max(1);
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let ramp = (day.saturating_mul(5)).min(u32::MAX as i64) as u32;
    ramp.min(configured_cap)
}

impl Resource {
    /// The cap actually enforced right now: the ramp schedule while warming,
    /// else the configured cap (spec §4.4).
    pub fn effective_cap(&self, now: DateTime<Utc>) -> u32 {
        match (self.health, self.warming_since) {
            (ResourceHealth::Warming, Some(since)) => {
                let days = (now - since).num_days();
                warmup_ramp_cap(self.daily_cap, days)
            }
            _ => self.daily_cap,
        }
    }

    /// Whether this resource is available to `tenant_id` (spec §4.4 filter):
    /// pooled, or exclusively leased to this tenant.
    pub fn available_to(&self, tenant_id: TenantId) -> bool {
        match self.leased_to {
            None => true,
            Some(leased) => leased == tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warmup_ramp_follows_schedule() {
        assert_eq!(warmup_ramp_cap(50, 1), 5);
        assert_eq!(warmup_ramp_cap(50, 2), 10);
        assert_eq!(warmup_ramp_cap(50, 9), 45);
    }

    #[test]
    fn warmup_ramp_caps_at_configured_limit() {
        assert_eq!(warmup_ramp_cap(50, 20), 50);
    }
}
