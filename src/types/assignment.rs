//! Assignment — the exclusive link of a Lead Pool Record to a Tenant (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AssignmentId, CampaignId, LeadId, TenantId};
use crate::channels::ChannelKind;

/// Local sequence status of an assignment (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Just created by the allocator, lead not yet enriched.
    New,
    /// Lead enriched, not yet placed in a sequence.
    Enriched,
    /// Actively progressing through the campaign sequence.
    InSequence,
    /// A reply was received; sequence paused pending classification or a
    /// human decision.
    Replied,
    /// A meeting was booked off this assignment.
    MeetingBooked,
    /// Terminal: converted to a deal.
    Converted,
    /// Terminal: lead explicitly declined.
    NotInterested,
    /// Temporarily non-actionable (out-of-office autoreply).
    OutOfOffice,
    /// Terminal: sequence exhausted with no reply.
    Archived,
}

impl AssignmentStatus {
    /// Statuses counted toward a tenant's active pipeline for replenishment
    /// (spec §4.6).
    pub fn counts_as_active_pipeline(self) -> bool {
        matches!(
            self,
            Self::New | Self::Enriched | Self::InSequence | Self::Replied
        )
    }

    /// Terminal statuses counted as conversions by the WHO detector (spec §4.11).
    pub fn is_conversion(self) -> bool {
        matches!(self, Self::Converted)
    }

    /// Terminal statuses counted as non-conversions by the WHO detector
    /// (spec §4.11); `completed_no_reply` is represented as `Archived` with no
    /// recorded reply, which the caller distinguishes via the activity log.
    pub fn is_non_conversion(self) -> bool {
        matches!(self, Self::NotInterested | Self::Archived)
    }

    /// Whether the assignment still occupies exclusive ownership of its lead
    /// (spec §3 exclusivity invariant is enforced at the storage layer via
    /// `deleted_at`; this is the *logical* counterpart used before a row is
    /// soft-deleted).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converted | Self::NotInterested | Self::Archived)
    }
}

/// An assignment's position in its campaign sequence, advanced one step per
/// successful send (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SequenceStep(pub u32);

/// The exclusive link from a Lead Pool Record to a Tenant (spec §3).
///
/// Exclusivity is enforced by a unique index over `(lead_id)` filtered on
/// `deleted_at IS NULL` (spec §3, §5) — at most one live row per lead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub tenant_id: TenantId,
    pub lead_id: LeadId,
    pub campaign_id: CampaignId,
    pub sequence_step: SequenceStep,
    pub status: AssignmentStatus,
    pub last_touched_at: Option<DateTime<Utc>>,
    pub last_channel: Option<ChannelKind>,
    pub retry_count: u32,
    /// Scorer output for this (lead, tenant) pairing, computed once at
    /// allocation time (spec §4.7); consulted by the JIT channel ALS gate.
    pub als_score: u32,
    /// Personalization artifact refs (hooks, openers) produced upstream of
    /// this subsystem and only stored/dispatched here (spec §1 non-goals).
    pub personalization_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// JIT step #1: assignment must be in-sequence, or replied with a
    /// follow-up armed (spec §4.8). The latter case is represented here as
    /// `Replied` plus a caller-supplied flag (sequence definitions decide when
    /// a follow-up is armed); this subsystem treats `InSequence` as the
    /// primary sendable state.
    pub fn is_sendable_status(&self, followup_armed: bool) -> bool {
        match self.status {
            AssignmentStatus::InSequence => true,
            AssignmentStatus::Replied => followup_armed,
            _ => false,
        }
    }
}
