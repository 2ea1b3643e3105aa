//! Scorer — deterministic weighted score → tier mapping (spec §4.7).

use std::collections::HashMap;

use crate::types::lead::LeadPoolRecord;
use crate::types::pattern::PatternRecord;
use crate::types::tenant::IcpVector;

/// Output bands (spec §4.7); boundaries are contractual — referenced by
/// downstream channel gates and content-generation routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Hot,
    Warm,
    Cool,
    Cold,
    Dead,
}

impl ScoreBand {
    /// Maps a 0–100 score to its band (spec §4.7 table).
    pub fn from_score(score: u32) -> Self {
        match score {
            85..=100 => Self::Hot,
            60..=84 => Self::Warm,
            35..=59 => Self::Cool,
            20..=34 => Self::Cold,
            _ => Self::Dead,
        }
    }
}

/// Platform-prior feature weights, used when a tenant has no learned
/// Pattern Record yet and no explicit override (spec §4.7).
fn platform_prior_weights() -> HashMap<&'static str, f64> {
    HashMap::from([
        ("title_seniority_match", 25.0),
        ("industry_match", 20.0),
        ("company_size_match", 15.0),
        ("funding_recency", 15.0),
        ("tech_stack_overlap", 15.0),
        ("engagement_signals", 10.0),
    ])
}

fn feature_value(lead: &LeadPoolRecord, icp: &IcpVector, feature: &str) -> f64 {
    match feature {
        "title_seniority_match" => lead
            .identity
            .title
            .as_deref()
            .map(|t| {
                let t = t.to_lowercase();
                if icp.titles.iter().any(|want| t.contains(&want.to_lowercase())) {
                    1.0
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0),
        "industry_match" => lead
            .firmographics
            .industry
            .as_deref()
            .map(|ind| {
                if icp.industries.iter().any(|want| want.eq_ignore_ascii_case(ind)) {
                    1.0
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0),
        "company_size_match" => lead
            .firmographics
            .size_band
            .as_deref()
            .map(|sz| {
                if icp.company_sizes.iter().any(|want| want.eq_ignore_ascii_case(sz)) {
                    1.0
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0),
        "funding_recency" => lead
            .firmographics
            .funding_signal_recency_days
            .map(|days| if days <= 90 { 1.0 } else { (365 - days.min(365)) as f64 / 365.0 })
            .unwrap_or(0.0),
        "tech_stack_overlap" => {
            if lead.firmographics.tech_signals.is_empty() {
                0.0
            } else {
                1.0
            }
        }
        "engagement_signals" => 0.0,
        _ => 0.0,
    }
}

/// Resolves the weight for a named feature: tenant override, then eligible
/// learned pattern lift, then platform prior (spec §4.7).
fn resolve_weight(
    feature: &str,
    icp: &IcpVector,
    pattern: Option<&PatternRecord>,
    min_confidence: f64,
    min_sample: u32,
) -> f64 {
    if let Some(&w) = icp.weight_overrides.get(feature) {
        return w;
    }
    if let Some(pattern) = pattern {
        if let Some(f) = pattern
            .eligible_features(min_confidence, min_sample)
            .into_iter()
            .find(|f| f.feature == feature)
        {
            return f.lift;
        }
    }
    *platform_prior_weights().get(feature).unwrap_or(&0.0)
}

/// Computes a deterministic 0–100 score for a lead against a tenant's ICP
/// and (optionally) learned WHO pattern (spec §4.7).
pub fn score(
    lead: &LeadPoolRecord,
    icp: &IcpVector,
    who_pattern: Option<&PatternRecord>,
    min_confidence: f64,
    min_sample: u32,
) -> u32 {
    let features = [
        "title_seniority_match",
        "industry_match",
        "company_size_match",
        "funding_recency",
        "tech_stack_overlap",
        "engagement_signals",
    ];

    let weight_sum: f64 = features
        .iter()
        .map(|f| resolve_weight(f, icp, who_pattern, min_confidence, min_sample))
        .sum();
    if weight_sum <= 0.0 {
        return 0;
    }

    let raw: f64 = features
        .iter()
        .map(|f| {
            let w = resolve_weight(f, icp, who_pattern, min_confidence, min_sample);
            w * feature_value(lead, icp, f)
        })
        .sum();

    let normalized = (raw / weight_sum) * 100.0;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    {
        normalized.clamp(0.0, 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lead::{ContactIdentity, EnrichmentProvenance, Firmographics, LeadStatus};
    use crate::types::ids::LeadId;

    fn lead() -> LeadPoolRecord {
        LeadPoolRecord {
            id: LeadId::new(),
            identity: ContactIdentity {
                title: Some("VP of Sales".to_owned()),
                ..Default::default()
            },
            firmographics: Firmographics {
                industry: Some("SaaS".to_owned()),
                size_band: Some("51-200".to_owned()),
                funding_signal_recency_days: Some(30),
                tech_signals: vec!["salesforce".to_owned()],
                ..Default::default()
            },
            provenance: EnrichmentProvenance::default(),
            email_status: None,
            status: LeadStatus::Enriched,
            provider_external_id: None,
            bounced: false,
            unsubscribed: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            deleted_at: None,
        }
    }

    fn icp() -> IcpVector {
        IcpVector {
            titles: vec!["VP".to_owned()],
            industries: vec!["SaaS".to_owned()],
            company_sizes: vec!["51-200".to_owned()],
            ..Default::default()
        }
    }

    #[test]
    fn full_match_scores_hot() {
        let s = score(&lead(), &icp(), None, 0.70, 20);
        assert!(s >= 85, "expected hot score, got {s}");
        assert_eq!(ScoreBand::from_score(s), ScoreBand::Hot);
    }

    #[test]
    fn no_match_scores_low() {
        let mut l = lead();
        l.identity.title = Some("Intern".to_owned());
        l.firmographics.industry = Some("Retail".to_owned());
        l.firmographics.size_band = Some("1-10".to_owned());
        l.firmographics.funding_signal_recency_days = None;
        l.firmographics.tech_signals.clear();
        let s = score(&l, &icp(), None, 0.70, 20);
        assert!(s < 35, "expected low score, got {s}");
    }
}
