//! Lead Pool & Allocator — owns leads, exclusively assigns at most one to a
//! tenant at a time (spec §4.6).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::engines::scorer;
use crate::engines::suppression::{SuppressionCheck, SuppressionIndex};
use crate::types::assignment::{Assignment, AssignmentStatus, SequenceStep};
use crate::types::campaign::Campaign;
use crate::types::ids::{AssignmentId, LeadId, TenantId};
use crate::types::lead::{ContactIdentity, EnrichmentProvenance, Firmographics, LeadPoolRecord, LeadStatus};
use crate::types::pattern::{PatternKind, PatternRecord};
use crate::types::suppression::SuppressionKey;
use crate::types::tenant::{Tenant, TenantTier};

/// The handful of `lead_pool` fields the Scorer reasons about (spec §4.7);
/// pulled separately from the suppression-check email lookup since scoring
/// needs firmographics the original query never selected.
#[derive(sqlx::FromRow)]
struct LeadScoringRow {
    email: Option<String>,
    title: Option<String>,
    industry: Option<String>,
    size_band: Option<String>,
    funding_signal_recency_days: Option<i64>,
    tech_signals_json: String,
}

impl LeadScoringRow {
    fn as_lead_pool_record(&self, lead_id: LeadId) -> LeadPoolRecord {
        LeadPoolRecord {
            id: lead_id,
            identity: ContactIdentity { title: self.title.clone(), ..Default::default() },
            firmographics: Firmographics {
                industry: self.industry.clone(),
                size_band: self.size_band.clone(),
                funding_signal_recency_days: self.funding_signal_recency_days,
                tech_signals: serde_json::from_str(&self.tech_signals_json).unwrap_or_default(),
                ..Default::default()
            },
            provenance: EnrichmentProvenance::default(),
            email_status: None,
            status: LeadStatus::Enriched,
            provider_external_id: None,
            bounced: false,
            unsubscribed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// Outcome counters for `source_and_populate` (spec §4.6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcingCounts {
    pub inserted: u32,
    pub suppressed: u32,
    pub duplicate: u32,
}

/// The Lead Pool & Allocator (spec §4.6).
#[derive(Clone)]
pub struct Allocator {
    db: SqlitePool,
    suppression: SuppressionIndex,
    /// Pattern-eligibility gate reused from the Scorer's own gating rule
    /// (spec §4.7, §4.11) — a learned WHO lift only counts once it clears
    /// the same confidence/sample bar the Pattern Learning job applies.
    scoring_min_confidence: f64,
    scoring_min_sample: u32,
}

impl Allocator {
    pub fn new(
        db: SqlitePool,
        suppression: SuppressionIndex,
        scoring_min_confidence: f64,
        scoring_min_sample: u32,
    ) -> Self {
        Self { db, suppression, scoring_min_confidence, scoring_min_sample }
    }

    /// Upserts sourced candidates into the pool by natural key, skipping on
    /// conflict (never overwriting) and testing suppression first (spec
    /// §4.6 `source_and_populate`).
    ///
    /// `candidates` are `(email, provider_external_id, linkedin_url)` triples
    /// as returned by an upstream ICP sourcing job; the sourcing query
    /// itself is an external collaborator (spec §1 non-goals).
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub async fn source_and_populate(
        &self,
        tenant_id: TenantId,
        candidates: &[(Option<String>, Option<String>, Option<String>)],
    ) -> Result<SourcingCounts, sqlx::Error> {
        let mut counts = SourcingCounts::default();

        for (email, provider_external_id, linkedin_url) in candidates {
            if let Some(email) = email.as_deref() {
                if let SuppressionCheck::Blocked { .. } =
                    self.suppression.is_suppressed(tenant_id, SuppressionKey::Email, email).await
                {
                    counts.suppressed += 1;
                    continue;
                }
            }

            let existing: Option<(String,)> = sqlx::query_as(
                "SELECT id FROM lead_pool \
                 WHERE deleted_at IS NULL AND ( \
                     (?1 IS NOT NULL AND email = ?1) OR \
                     (?2 IS NOT NULL AND provider_external_id = ?2) OR \
                     (?3 IS NOT NULL AND linkedin_url = ?3)) \
                 LIMIT 1",
            )
            .bind(email)
            .bind(provider_external_id)
            .bind(linkedin_url)
            .fetch_optional(&self.db)
            .await?;

            if existing.is_some() {
                counts.duplicate += 1;
                continue;
            }

            let id = LeadId::new();
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO lead_pool \
                 (id, email, phone, linkedin_url, first_name, last_name, title, \
                  company_name, company_domain, size_band, industry, \
                  provider_external_id, status, bounced, unsubscribed, created_at, updated_at) \
                 VALUES (?1, ?2, NULL, ?3, NULL, NULL, NULL, NULL, NULL, NULL, NULL, ?4, 'new', 0, 0, ?5, ?5)",
            )
            .bind(id.to_string())
            .bind(email)
            .bind(linkedin_url)
            .bind(provider_external_id)
            .bind(now)
            .execute(&self.db)
            .await?;
            counts.inserted += 1;
        }

        Ok(counts)
    }

    /// Creates up to `n` new exclusive assignments for `tenant`, racing
    /// safely against concurrent allocators via the `lead_id` unique
    /// constraint filtered on `deleted_at IS NULL` (spec §4.6, §5).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub async fn allocate(
        &self,
        tenant: &Tenant,
        campaign: &Campaign,
        n: u32,
    ) -> Result<Vec<Assignment>, sqlx::Error> {
        let candidate_ids: Vec<(String,)> = sqlx::query_as(
            "SELECT lp.id FROM lead_pool lp \
             LEFT JOIN assignments a ON a.lead_id = lp.id AND a.deleted_at IS NULL \
             WHERE lp.deleted_at IS NULL AND a.id IS NULL \
               AND lp.bounced = 0 AND lp.unsubscribed = 0 \
             ORDER BY lp.created_at ASC \
             LIMIT ?1",
        )
        .bind(i64::from(n))
        .fetch_all(&self.db)
        .await?;

        let who_pattern = self.load_who_pattern(tenant.id).await?;

        let mut created = Vec::with_capacity(candidate_ids.len());
        for (lead_id_str,) in candidate_ids {
            let Ok(lead_id) = lead_id_str.parse::<LeadId>() else { continue };

            let Some(lead_row) = sqlx::query_as::<_, LeadScoringRow>(
                "SELECT email, title, industry, size_band, funding_signal_recency_days, \
                        tech_signals_json \
                 FROM lead_pool WHERE id = ?1",
            )
            .bind(&lead_id_str)
            .fetch_optional(&self.db)
            .await?
            else {
                continue;
            };

            if let Some(email) = lead_row.email.as_deref() {
                if let SuppressionCheck::Blocked { .. } =
                    self.suppression.is_suppressed(tenant.id, SuppressionKey::Email, email).await
                {
                    continue;
                }
            }

            let als_score = scorer::score(
                &lead_row.as_lead_pool_record(lead_id),
                &tenant.icp,
                who_pattern.as_ref(),
                self.scoring_min_confidence,
                self.scoring_min_sample,
            );

            let assignment = Assignment {
                id: AssignmentId::new(),
                tenant_id: tenant.id,
                lead_id,
                campaign_id: campaign.id,
                sequence_step: SequenceStep(1),
                status: AssignmentStatus::New,
                last_touched_at: None,
                last_channel: None,
                retry_count: 0,
                als_score,
                personalization_refs: Vec::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            };

            let insert = sqlx::query(
                "INSERT INTO assignments \
                 (id, tenant_id, lead_id, campaign_id, sequence_step, status, \
                  last_touched_at, last_channel, retry_count, als_score, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, 1, 'new', NULL, NULL, 0, ?5, ?6, ?6) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(assignment.id.to_string())
            .bind(tenant.id.to_string())
            .bind(lead_id.to_string())
            .bind(campaign.id.to_string())
            .bind(i64::from(als_score))
            .bind(assignment.created_at)
            .execute(&self.db)
            .await?;

            // The exclusivity unique index on (lead_id) WHERE deleted_at IS
            // NULL is what actually arbitrates a race between concurrent
            // allocators; a conflict here means another caller won this lead.
            if insert.rows_affected() == 1 {
                created.push(assignment);
            }
        }

        Ok(created)
    }

    /// Loads the most recently computed eligible-or-not WHO pattern for
    /// `tenant_id`, falling back to the platform-wide pattern (spec §4.7,
    /// §4.11); the Scorer itself re-applies the confidence/sample gate per
    /// feature, so an ineligible record is still safe to hand in here.
    async fn load_who_pattern(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<PatternRecord>, sqlx::Error> {
        let row: Option<(String, Option<String>, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, tenant_id, features_json, computed_at FROM pattern_records \
             WHERE kind = ?1 AND (tenant_id = ?2 OR tenant_id IS NULL) \
             ORDER BY (tenant_id IS NOT NULL) DESC, computed_at DESC \
             LIMIT 1",
        )
        .bind(PatternKind::Who)
        .bind(tenant_id.to_string())
        .fetch_optional(&self.db)
        .await?;

        Ok(row.and_then(|(id, tenant_id, features_json, computed_at)| {
            Some(PatternRecord {
                id: id.parse().ok()?,
                tenant_id: tenant_id.and_then(|t| t.parse().ok()),
                kind: PatternKind::Who,
                features: serde_json::from_str(&features_json).unwrap_or_default(),
                computed_at,
            })
        }))
    }

    /// Computes the active-pipeline gap and tops it up via source+allocate
    /// (spec §4.6 `monthly_replenishment`).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying queries fail.
    pub async fn monthly_replenishment(
        &self,
        tenant: &Tenant,
        campaign: &Campaign,
        tier: TenantTier,
    ) -> Result<Vec<Assignment>, sqlx::Error> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM assignments \
             WHERE tenant_id = ?1 AND deleted_at IS NULL \
               AND status IN ('new', 'enriched', 'in_sequence', 'replied')",
        )
        .bind(tenant.id.to_string())
        .fetch_one(&self.db)
        .await?;

        #[allow(clippy::cast_sign_loss)]
        let active = active.max(0) as u32;
        let quota = tier.monthly_lead_quota();
        let gap = quota.saturating_sub(active);

        if gap == 0 {
            return Ok(Vec::new());
        }
        self.allocate(tenant, campaign, gap).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sourcing_counts_default_to_zero() {
        let counts = SourcingCounts::default();
        assert_eq!(counts.inserted, 0);
        assert_eq!(counts.suppressed, 0);
        assert_eq!(counts.duplicate, 0);
    }
}
