//! Conversation Thread — the ordered message history of a (lead, channel)
//! pair (spec §3, §4.10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LeadId, MessageId, ThreadId};
use crate::channels::ChannelKind;

/// Direction of a message within a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum MessageDirection {
    /// Sent by the platform on the tenant's behalf.
    Outbound,
    /// Received from the lead.
    Inbound,
}

/// The closed set of inbound-message intents the Reply Router classifies
/// into (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ReplyIntent {
    /// Wants to book a meeting.
    MeetingInterest,
    /// Asked a question requiring a reply.
    Question,
    /// Engaged positively without a concrete ask.
    PositiveEngagement,
    /// Explicitly declined.
    NotInterested,
    /// Automated out-of-office reply.
    OutOfOffice,
    /// Recipient is not the intended contact.
    WrongPerson,
    /// Suggested a different contact as a better fit.
    Referral,
    /// Hostile or a complaint; never auto-replied to.
    AngryOrComplaint,
}

/// A single message in a conversation thread (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: MessageId,
    pub thread_id: ThreadId,
    pub direction: MessageDirection,
    pub body: String,
    pub provider_msg_id: Option<String>,
    /// Set only for inbound messages that were classified (spec §4.10 step 3).
    pub intent: Option<ReplyIntent>,
    pub intent_confidence: Option<f64>,
    pub occurred_at: DateTime<Utc>,
}

/// A (lead, channel) pair carrying ordered messages; one active thread per
/// pair (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationThread {
    pub id: ThreadId,
    pub lead_id: LeadId,
    pub channel: ChannelKind,
    /// Provider-side thread/conversation reference used to re-associate
    /// subsequent inbound events (email `references` header, SMS sender
    /// number, LinkedIn conversation urn).
    pub provider_thread_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
