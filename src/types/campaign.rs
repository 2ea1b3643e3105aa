//! Campaign — a tenant's outreach program (spec §3).

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CampaignId, TenantId};
use crate::channels::ChannelKind;
use crate::types::tenant::PermissionMode;

/// Campaign lifecycle status (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Being configured, not yet dispatching.
    Draft,
    /// Dispatching per its sequence.
    Active,
    /// Temporarily halted; assignments retain their position.
    Paused,
    /// Sequence finished for all assignments.
    Completed,
}

/// One step of a campaign's ordered touch plan (spec §3 Sequence, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceDefinitionStep {
    pub step: u32,
    pub channel: ChannelKind,
    /// Days to wait after the previous step before this one becomes due.
    pub wait_days: u32,
}

/// Per-tenant business-hours send window (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendWindow {
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
    /// IANA timezone name, e.g. `"America/New_York"`.
    pub timezone: String,
    /// 1 = Monday ... 7 = Sunday (chrono::Weekday numbering via `number_from_monday`).
    pub active_weekdays: Vec<u8>,
}

impl Default for SendWindow {
    fn default() -> Self {
        Self {
            start_local: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            end_local: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
            timezone: "UTC".to_owned(),
            active_weekdays: vec![1, 2, 3, 4, 5],
        }
    }
}

/// A tenant's outreach program (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub tenant_id: TenantId,
    pub name: String,
    pub status: CampaignStatus,
    /// Channel allocation percentages; must sum to 100 (spec §3 invariant).
    pub channel_allocation: Vec<(ChannelKind, u8)>,
    pub permission_mode: PermissionMode,
    pub lead_quota: u32,
    pub sequence: Vec<SequenceDefinitionStep>,
    pub send_window: SendWindow,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Validates the channel allocation invariant (spec §3).
    pub fn channel_allocation_is_valid(&self) -> bool {
        let total: u32 = self.channel_allocation.iter().map(|(_, pct)| u32::from(*pct)).sum();
        total == 100
    }

    /// Looks up the sequence definition for a given step (spec §4.9).
    pub fn step_definition(&self, step: u32) -> Option<&SequenceDefinitionStep> {
        self.sequence.iter().find(|s| s.step == step)
    }
}
