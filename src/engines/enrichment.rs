//! Enrichment Waterfall — tiered provider pipeline with a confidence gate
//! and a per-batch premium budget cap (spec §4.5).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::engines::cache::{CacheLayer, CacheLookup};
use crate::providers::{EnrichmentFill, EnrichmentProvider, ProviderError};
use crate::types::lead::{
    ContactIdentity, EnrichmentProvenance, Firmographics, LeadPoolRecord, ProvenanceTier,
};

/// Tracks how many leads in the current batch have fallen through to the
/// premium tier, shared across concurrent workers via an atomic counter —
/// the same lock-free pattern the teacher uses for its token budgets.
pub struct BatchBudget {
    batch_size: u32,
    max_percent: f64,
    premium_used: AtomicU32,
}

impl BatchBudget {
    pub fn new(batch_size: u32, max_percent: f64) -> Arc<Self> {
        Arc::new(Self { batch_size, max_percent, premium_used: AtomicU32::new(0) })
    }

    /// Reserves one premium-tier slot if the batch cap allows it (spec
    /// §4.5: "no more than a configurable fraction of any batch may fall
    /// through to this tier").
    pub fn try_reserve_premium(&self) -> bool {
        #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let cap = (self.batch_size as f64 * self.max_percent).floor() as u32;
        let prev = self.premium_used.fetch_add(1, Ordering::SeqCst);
        if prev >= cap {
            self.premium_used.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }
}

/// Merges a fill into an accumulator without overwriting a higher-confidence
/// value already present (spec §4.5).
fn merge(acc: &mut (ContactIdentity, Firmographics, f64, ProvenanceTier), fill: EnrichmentFill, tier: ProvenanceTier) {
    if fill.confidence <= acc.2 && acc.2 > 0.0 {
        return;
    }
    if acc.0.email.is_none() {
        acc.0.email = fill.identity.email;
    }
    if acc.0.phone.is_none() {
        acc.0.phone = fill.identity.phone;
    }
    if acc.0.linkedin_url.is_none() {
        acc.0.linkedin_url = fill.identity.linkedin_url;
    }
    if acc.0.first_name.is_none() {
        acc.0.first_name = fill.identity.first_name;
    }
    if acc.0.last_name.is_none() {
        acc.0.last_name = fill.identity.last_name;
    }
    if acc.0.title.is_none() {
        acc.0.title = fill.identity.title;
    }
    if acc.1.company_name.is_none() {
        acc.1.company_name = fill.firmographics.company_name;
    }
    if acc.1.company_domain.is_none() {
        acc.1.company_domain = fill.firmographics.company_domain;
    }
    if acc.1.industry.is_none() {
        acc.1.industry = fill.firmographics.industry;
    }
    if acc.1.size_band.is_none() {
        acc.1.size_band = fill.firmographics.size_band;
    }
    if acc.1.funding_signal_recency_days.is_none() {
        acc.1.funding_signal_recency_days = fill.firmographics.funding_signal_recency_days;
    }
    if acc.1.tech_signals.is_empty() {
        acc.1.tech_signals = fill.firmographics.tech_signals;
    }
    acc.2 = acc.2.max(fill.confidence);
    acc.3 = tier;
}

/// Outcome of running a record through the waterfall (spec §4.5).
pub enum WaterfallOutcome {
    /// Merged record cleared the acceptance gate.
    Accepted { identity: ContactIdentity, firmographics: Firmographics, provenance: EnrichmentProvenance },
    /// Gate not cleared; `provenance` notes how far the waterfall got.
    Unenriched { provenance: EnrichmentProvenance },
}

/// The Enrichment Waterfall (spec §4.5).
pub struct EnrichmentWaterfall {
    cache: CacheLayer,
    primary: Arc<dyn EnrichmentProvider>,
    supplement: Arc<dyn EnrichmentProvider>,
    premium: Arc<dyn EnrichmentProvider>,
    confidence_threshold: f64,
}

impl EnrichmentWaterfall {
    pub fn new(
        cache: CacheLayer,
        primary: Arc<dyn EnrichmentProvider>,
        supplement: Arc<dyn EnrichmentProvider>,
        premium: Arc<dyn EnrichmentProvider>,
        confidence_threshold: f64,
    ) -> Self {
        Self { cache, primary, supplement, premium, confidence_threshold }
    }

    /// Runs a lead through the waterfall: cache, primary, supplement, then
    /// (budget permitting) premium (spec §4.5).
    pub async fn enrich(&self, lead: &LeadPoolRecord, batch: &BatchBudget) -> WaterfallOutcome {
        let mut acc = (lead.identity.clone(), lead.firmographics.clone(), 0.0_f64, ProvenanceTier::Cache);
        let fingerprint = fingerprint_of(&lead.identity);

        if let Ok(CacheLookup::Hit(fill)) =
            self.cache.get::<EnrichmentFillCacheEntry>(&fingerprint).await
        {
            merge(&mut acc, fill.into(), ProvenanceTier::Cache);
        } else {
            match self.primary.lookup(&lead.identity).await {
                Ok(fill) => {
                    let _ = self
                        .cache
                        .put(
                            &fingerprint,
                            &EnrichmentFillCacheEntry::from(fill.clone()),
                            chrono::Duration::days(super::cache::ENRICHMENT_TTL_DAYS),
                        )
                        .await;
                    merge(&mut acc, fill, ProvenanceTier::Primary);
                }
                Err(ProviderError::NoMatch) => {}
                Err(err) => warn!(%err, "primary enrichment tier failed, falling through"),
            }
        }

        let missing_critical = acc.0.linkedin_url.is_none() || acc.1.tech_signals.is_empty();
        if missing_critical {
            match self.supplement.lookup(&lead.identity).await {
                Ok(fill) => merge(&mut acc, fill, ProvenanceTier::Supplement),
                Err(ProviderError::NoMatch) => {}
                Err(err) => warn!(%err, "supplement enrichment tier failed, falling through"),
            }
        }

        if acc.2 < self.confidence_threshold {
            if batch.try_reserve_premium() {
                match self.premium.lookup(&lead.identity).await {
                    Ok(fill) => merge(&mut acc, fill, ProvenanceTier::Premium),
                    Err(ProviderError::NoMatch) => {}
                    Err(err) => warn!(%err, "premium enrichment tier failed"),
                }
            }
        }

        let (identity, firmographics, confidence, tier_reached) = acc;
        let gate_cleared = identity.has_required_fields()
            && firmographics.has_company()
            && confidence >= self.confidence_threshold;

        let provenance = EnrichmentProvenance {
            tier_reached,
            confidence,
            fingerprint,
            note: if gate_cleared { None } else { Some("below_acceptance_threshold".to_owned()) },
        };

        if gate_cleared {
            WaterfallOutcome::Accepted { identity, firmographics, provenance }
        } else {
            WaterfallOutcome::Unenriched { provenance }
        }
    }
}

fn fingerprint_of(identity: &ContactIdentity) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    identity.email.hash(&mut hasher);
    identity.linkedin_url.hash(&mut hasher);
    format!("enrichment:{:x}", hasher.finish())
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct EnrichmentFillCacheEntry {
    identity: ContactIdentity,
    firmographics: Firmographics,
    confidence: f64,
}

impl From<EnrichmentFill> for EnrichmentFillCacheEntry {
    fn from(fill: EnrichmentFill) -> Self {
        Self { identity: fill.identity, firmographics: fill.firmographics, confidence: fill.confidence }
    }
}

impl From<EnrichmentFillCacheEntry> for EnrichmentFill {
    fn from(entry: EnrichmentFillCacheEntry) -> Self {
        Self { identity: entry.identity, firmographics: entry.firmographics, confidence: entry.confidence }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_budget_caps_at_configured_percent() {
        let budget = BatchBudget::new(20, 0.15);
        // floor(20 * 0.15) == 3
        assert!(budget.try_reserve_premium());
        assert!(budget.try_reserve_premium());
        assert!(budget.try_reserve_premium());
        assert!(!budget.try_reserve_premium());
    }
}
