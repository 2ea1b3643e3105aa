//! Lead Pool Record — the master, platform-owned lead (spec §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::LeadId;

/// Deliverability classification of the email address (spec §4.5).
///
/// `Guessed` and `Invalid` block the email channel at JIT step #8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum EmailStatus {
    /// Confirmed deliverable by the verification provider.
    Verified,
    /// Pattern-inferred, not independently confirmed.
    Guessed,
    /// Confirmed undeliverable.
    Invalid,
    /// Domain accepts all addresses; deliverability unknown.
    CatchAll,
}

impl EmailStatus {
    /// Whether this status permits an email send (JIT step #8, spec §4.8).
    pub fn permits_send(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// Which enrichment tier most recently produced this record's data (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ProvenanceTier {
    /// Served from the cache layer, no provider call made.
    Cache,
    /// Resolved by the primary enrichment provider.
    Primary,
    /// Resolved by the supplement provider after a primary miss.
    Supplement,
    /// Resolved by the premium (deep-research) provider.
    Premium,
}

/// Contact identity fields (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactIdentity {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
}

impl ContactIdentity {
    /// Required identity fields present after acceptance (spec §4.5).
    pub fn has_required_fields(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.is_empty())
            && self.first_name.as_deref().is_some_and(|v| !v.is_empty())
            && self.last_name.as_deref().is_some_and(|v| !v.is_empty())
    }
}

/// Sparse firmographic fact sheet (spec §3, ~50-field set collapsed to a JSON
/// bag plus the handful of fields the scorer and allocator reason about
/// directly).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Firmographics {
    pub company_name: Option<String>,
    pub company_domain: Option<String>,
    pub size_band: Option<String>,
    pub industry: Option<String>,
    pub funding_signal_recency_days: Option<i64>,
    pub tech_signals: Vec<String>,
    /// Remaining sparse fields not promoted to a named column.
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl Firmographics {
    /// Required field present after acceptance (spec §4.5).
    pub fn has_company(&self) -> bool {
        self.company_name.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// Enrichment provenance metadata (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentProvenance {
    pub tier_reached: ProvenanceTier,
    pub confidence: f64,
    pub fingerprint: String,
    /// Human-readable note when the record fell short of the acceptance gate,
    /// e.g. `"premium_budget_exceeded"` (spec §4.5, scenario 5).
    pub note: Option<String>,
}

impl Default for EnrichmentProvenance {
    fn default() -> Self {
        Self {
            tier_reached: ProvenanceTier::Cache,
            confidence: 0.0,
            fingerprint: String::new(),
            note: None,
        }
    }
}

/// Enrichment + acceptance status of a lead pool record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum LeadStatus {
    /// Sourced but not yet run through the waterfall.
    New,
    /// Passed the acceptance gate (spec §4.5).
    Enriched,
}

/// The master lead record, owned by the platform, never by a tenant directly
/// (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadPoolRecord {
    pub id: LeadId,
    pub identity: ContactIdentity,
    pub firmographics: Firmographics,
    pub provenance: EnrichmentProvenance,
    pub email_status: Option<EmailStatus>,
    pub status: LeadStatus,
    /// Upstream provider's own id for this person/company, when sourced via API.
    pub provider_external_id: Option<String>,
    /// Never reset automatically once set (spec §3 invariant).
    pub bounced: bool,
    /// Never reset automatically once set (spec §3 invariant).
    pub unsubscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl LeadPoolRecord {
    /// Whether this lead is globally blocked from any further outreach
    /// (JIT step #6, spec §4.8).
    pub fn globally_blocked(&self) -> bool {
        self.bounced || self.unsubscribed
    }

    /// Natural-key dedup fields used by `source_and_populate` (spec §4.6).
    pub fn natural_keys(&self) -> Vec<String> {
        [
            self.identity.email.clone(),
            self.provider_external_id.clone(),
            self.identity.linkedin_url.clone(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
