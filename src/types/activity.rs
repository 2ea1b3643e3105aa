//! Activity — the append-only event log of every touch attempt (spec §3, §5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ActivityId, AssignmentId, LeadId, TenantId};
use crate::channels::ChannelKind;

/// Outcome of a single dispatch attempt (spec §3, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ActivityAction {
    /// Dispatched to the channel driver successfully.
    Sent,
    /// Provider confirmed delivery.
    Delivered,
    /// Recipient opened the message (email only).
    Opened,
    /// Recipient clicked a tracked link (email only).
    Clicked,
    /// Recipient replied.
    Replied,
    /// Provider reported a hard bounce.
    Bounced,
    /// Blocked before dispatch by the JIT validator or a driver-side
    /// compliance check; see `reason`.
    Rejected,
    /// Dispatched but the provider returned a permanent error.
    Failed,
}

/// Content and provenance snapshot persisted on every `sent` activity
/// (spec §3; consumed by the WHAT detector, spec §4.11).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub template_ref: Option<String>,
    pub ab_arm_ref: Option<String>,
    pub ai_model_ref: Option<String>,
}

/// A single append-only event on an assignment (spec §3, §5 ordering
/// guarantees: strictly ordered by wall-clock timestamp, never updated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub assignment_id: AssignmentId,
    pub channel: ChannelKind,
    pub action: ActivityAction,
    pub provider_message_id: Option<String>,
    pub content: ContentSnapshot,
    /// Sequence step this activity corresponds to (spec §3).
    pub sequence_step: u32,
    /// JIT/driver rejection sub-reason, set only when `action` is `rejected`
    /// or `failed` (spec §7).
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
