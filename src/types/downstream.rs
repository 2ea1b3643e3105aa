//! Meeting and Deal — downstream artifacts produced by the Reply Router
//! (spec §3: "out of core scope except for the creation event").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AssignmentId, DealId, LeadId, MeetingId, TenantId};

/// A booked meeting, created when the Reply Router's `meeting_interest`
/// flow reaches a confirmed booking (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub assignment_id: AssignmentId,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    /// e.g. `"discovery_call"`, `"demo"` — free-form, set by the booking flow.
    pub meeting_type: String,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Deal stage, tracked only far enough to support the conversion-rate
/// aggregation the WHO detector needs (spec §4.11); full deal management is
/// external (spec §1 non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum DealStage {
    /// Opened off a booked meeting.
    Open,
    /// Closed and won.
    Won,
    /// Closed and lost.
    Lost,
}

/// A downstream sales artifact created by a meeting outcome, out of core
/// scope beyond its creation and terminal stage (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub meeting_id: Option<MeetingId>,
    pub stage: DealStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
