//! Suppression Entry — a compliance/exclusion record checked by the
//! Suppression Index (spec §3, §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SuppressionId, TenantId};

/// Breadth of a suppression entry (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SuppressionScope {
    /// Blocks every tenant.
    Global,
    /// Blocks a single tenant.
    Tenant,
    /// Blocks an entire email domain for a tenant.
    Domain,
}

/// The field a suppression entry matches against (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SuppressionKey {
    /// Matches a normalized email address.
    Email,
    /// Matches an email domain.
    Domain,
    /// Matches an E.164 phone number.
    Phone,
}

/// Why an entry was created (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum SuppressionReason {
    /// Already a paying customer of the tenant.
    ExistingCustomer,
    /// Formerly a customer.
    PastCustomer,
    /// Identified as a competitor.
    Competitor,
    /// A partner, not a prospect.
    Partner,
    /// Explicit do-not-contact request.
    DoNotContact,
    /// Email hard-bounced.
    Bounced,
    /// Recipient unsubscribed.
    Unsubscribed,
    /// Recipient marked the message as spam.
    SpamComplaint,
}

/// A compliance/exclusion record (spec §3, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionEntry {
    pub id: SuppressionId,
    /// `None` for `Global` scope.
    pub tenant_id: Option<TenantId>,
    pub scope: SuppressionScope,
    pub key: SuppressionKey,
    /// The normalized value matched: an email, a domain, or an E.164 phone
    /// number, depending on `key`.
    pub value: String,
    pub reason: SuppressionReason,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SuppressionEntry {
    /// Whether this entry is currently in force (spec §4.1: expired entries
    /// do not block).
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none() && self.expires_at.map_or(true, |exp| exp > now)
    }
}
