//! Pattern Record — offline-learned weight vectors consumed by the Scorer
//! and Scheduler (spec §3, §4.11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{PatternId, TenantId};

/// The four detector families (spec §4.11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PatternKind {
    /// Conversion-rate stratified by lead segment.
    Who,
    /// Subject-line/opener features correlated with reply-rate.
    What,
    /// Day-of-week × hour-of-day conversion lift.
    When,
    /// Channel and channel-sequence lift.
    How,
}

/// One learned (feature → lift) entry within a Pattern Record's sparse
/// vector (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternFeature {
    pub feature: String,
    pub lift: f64,
    pub sample_size: u32,
    pub confidence: f64,
}

/// A per-tenant (or platform-wide) learned weight vector (spec §3, §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: PatternId,
    /// `None` for a platform-wide pattern.
    pub tenant_id: Option<TenantId>,
    pub kind: PatternKind,
    pub features: Vec<PatternFeature>,
    pub computed_at: DateTime<Utc>,
}

impl PatternRecord {
    /// Gating rule (spec §4.11): a pattern is eligible to influence
    /// production only once sample and confidence both clear the threshold.
    /// Ungated patterns are still stored, for visibility only.
    pub fn eligible_features(&self, min_confidence: f64, min_sample: u32) -> Vec<&PatternFeature> {
        self.features
            .iter()
            .filter(|f| f.confidence >= min_confidence && f.sample_size >= min_sample)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PatternRecord {
        PatternRecord {
            id: PatternId::new(),
            tenant_id: None,
            kind: PatternKind::Who,
            features: vec![
                PatternFeature {
                    feature: "title:vp_sales".to_owned(),
                    lift: 1.4,
                    sample_size: 25,
                    confidence: 0.8,
                },
                PatternFeature {
                    feature: "title:intern".to_owned(),
                    lift: 0.2,
                    sample_size: 5,
                    confidence: 0.9,
                },
            ],
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn gating_drops_undersampled_features() {
        let r = record();
        let eligible = r.eligible_features(0.7, 20);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].feature, "title:vp_sales");
    }
}
