//! Enrichment Flow — the periodic job that pulls unassigned-or-stale leads
//! through the Enrichment Waterfall and persists accepted fields (spec §2
//! data flow, §4.5).
//!
//! Leads live in the platform-owned pool before they are assigned to any
//! tenant, so this job runs the Waterfall and the confidence gate only; the
//! per-tenant scoring step (spec §4.7) runs against a tenant's ICP vector at
//! allocation time, not here (see `DESIGN.md`).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::engines::enrichment::{BatchBudget, EnrichmentWaterfall, WaterfallOutcome};
use crate::types::ids::LeadId;
use crate::types::lead::{ContactIdentity, EnrichmentProvenance, Firmographics, LeadPoolRecord, LeadStatus};

/// Leads untouched for longer than this are re-run through the waterfall
/// even if already enriched, to pick up upstream data drift.
const STALE_AFTER_DAYS: i64 = 30;

/// Counts produced by one enrichment pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnrichmentCounts {
    pub considered: u32,
    pub accepted: u32,
    pub unenriched: u32,
}

/// Runs one batch of the Enrichment Flow (spec §4.5).
///
/// # Errors
///
/// Returns an error if the candidate query or a persist write fails.
/// Per-lead waterfall failures never abort the batch.
pub async fn run_once(
    db: &SqlitePool,
    waterfall: &EnrichmentWaterfall,
    batch_size: u32,
    batch_budget_percent: f64,
) -> Result<EnrichmentCounts, sqlx::Error> {
    let leads = due_leads(db, batch_size).await?;
    let batch_len = u32::try_from(leads.len()).unwrap_or(u32::MAX).max(1);
    let budget = BatchBudget::new(batch_len, batch_budget_percent);

    let mut counts = EnrichmentCounts::default();
    for lead in leads {
        counts.considered += 1;
        match waterfall.enrich(&lead, &budget).await {
            WaterfallOutcome::Accepted { identity, firmographics, provenance } => {
                persist_accepted(db, lead.id, &identity, &firmographics, &provenance).await?;
                counts.accepted += 1;
            }
            WaterfallOutcome::Unenriched { provenance } => {
                persist_provenance_only(db, lead.id, &provenance).await?;
                counts.unenriched += 1;
                warn!(lead = %lead.id, note = ?provenance.note, "lead fell short of enrichment gate");
            }
        }
    }

    info!(considered = counts.considered, accepted = counts.accepted, "enrichment flow batch complete");
    Ok(counts)
}

async fn due_leads(db: &SqlitePool, batch_size: u32) -> Result<Vec<LeadPoolRecord>, sqlx::Error> {
    let stale_before = Utc::now() - chrono::Duration::days(STALE_AFTER_DAYS);
    let rows: Vec<LeadRow> = sqlx::query_as(
        "SELECT id, email, phone, linkedin_url, first_name, last_name, title, \
                company_name, company_domain, size_band, industry, \
                funding_signal_recency_days, provider_external_id, \
                status, bounced, unsubscribed, created_at, updated_at \
         FROM lead_pool \
         WHERE deleted_at IS NULL AND (status = 'new' OR updated_at < ?1) \
         ORDER BY updated_at ASC \
         LIMIT ?2",
    )
    .bind(stale_before)
    .bind(i64::from(batch_size))
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(LeadRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct LeadRow {
    id: String,
    email: Option<String>,
    phone: Option<String>,
    linkedin_url: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    company_name: Option<String>,
    company_domain: Option<String>,
    size_band: Option<String>,
    industry: Option<String>,
    funding_signal_recency_days: Option<i64>,
    provider_external_id: Option<String>,
    status: String,
    bounced: bool,
    unsubscribed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LeadRow {
    fn into_record(self) -> LeadPoolRecord {
        let id = self.id.parse::<LeadId>().unwrap_or_default();
        LeadPoolRecord {
            id,
            identity: ContactIdentity {
                email: self.email,
                phone: self.phone,
                linkedin_url: self.linkedin_url,
                first_name: self.first_name,
                last_name: self.last_name,
                title: self.title,
            },
            firmographics: Firmographics {
                company_name: self.company_name,
                company_domain: self.company_domain,
                size_band: self.size_band,
                industry: self.industry,
                funding_signal_recency_days: self.funding_signal_recency_days,
                tech_signals: Vec::new(),
                extra: serde_json::Value::Null,
            },
            provenance: EnrichmentProvenance::default(),
            email_status: None,
            status: if self.status == "enriched" { LeadStatus::Enriched } else { LeadStatus::New },
            provider_external_id: self.provider_external_id,
            bounced: self.bounced,
            unsubscribed: self.unsubscribed,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: None,
        }
    }
}

async fn persist_accepted(
    db: &SqlitePool,
    lead_id: LeadId,
    identity: &ContactIdentity,
    firmographics: &Firmographics,
    provenance: &EnrichmentProvenance,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE lead_pool SET \
            email = COALESCE(?1, email), phone = COALESCE(?2, phone), \
            linkedin_url = COALESCE(?3, linkedin_url), first_name = COALESCE(?4, first_name), \
            last_name = COALESCE(?5, last_name), title = COALESCE(?6, title), \
            company_name = COALESCE(?7, company_name), company_domain = COALESCE(?8, company_domain), \
            size_band = COALESCE(?9, size_band), industry = COALESCE(?10, industry), \
            funding_signal_recency_days = COALESCE(?11, funding_signal_recency_days), \
            provenance_tier = ?12, provenance_confidence = ?13, provenance_fingerprint = ?14, \
            provenance_note = ?15, status = 'enriched', updated_at = ?16 \
         WHERE id = ?17",
    )
    .bind(&identity.email)
    .bind(&identity.phone)
    .bind(&identity.linkedin_url)
    .bind(&identity.first_name)
    .bind(&identity.last_name)
    .bind(&identity.title)
    .bind(&firmographics.company_name)
    .bind(&firmographics.company_domain)
    .bind(&firmographics.size_band)
    .bind(&firmographics.industry)
    .bind(firmographics.funding_signal_recency_days)
    .bind(provenance.tier_reached)
    .bind(provenance.confidence)
    .bind(&provenance.fingerprint)
    .bind(&provenance.note)
    .bind(Utc::now())
    .bind(lead_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

async fn persist_provenance_only(
    db: &SqlitePool,
    lead_id: LeadId,
    provenance: &EnrichmentProvenance,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE lead_pool SET \
            provenance_tier = ?1, provenance_confidence = ?2, provenance_fingerprint = ?3, \
            provenance_note = ?4, updated_at = ?5 \
         WHERE id = ?6",
    )
    .bind(provenance.tier_reached)
    .bind(provenance.confidence)
    .bind(&provenance.fingerprint)
    .bind(&provenance.note)
    .bind(Utc::now())
    .bind(lead_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}
