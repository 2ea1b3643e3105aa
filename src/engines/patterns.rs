//! Pattern Detectors — offline weekly learning that turns observed outcomes
//! into weight updates for the Scorer and Scheduler (spec §4.11).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::types::ids::TenantId;
use crate::types::pattern::{PatternFeature, PatternKind, PatternRecord};

/// Lower bound of the Wilson score interval for a binomial proportion,
/// used as this detector's `confidence`: a segment with a small sample can
/// show an extreme raw rate but should not be trusted, and the lower bound
/// shrinks toward 0 as `total` shrinks even when `successes / total` is high.
fn wilson_lower_bound(successes: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let z = 1.96_f64; // 95% confidence
    let n = f64::from(total);
    let p = f64::from(successes) / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let centre = p + z2 / (2.0 * n);
    let margin = z * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt();
    ((centre - margin) / denom).clamp(0.0, 1.0)
}

/// The Pattern Detectors (spec §4.11). Runs weekly per tenant.
pub struct PatternDetectors {
    db: SqlitePool,
}

impl PatternDetectors {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Runs all four detector families for a tenant (spec §4.11).
    ///
    /// # Errors
    ///
    /// Returns an error if any of the underlying aggregate queries fail.
    pub async fn compute_all(
        &self,
        tenant_id: TenantId,
        min_sample: u32,
    ) -> Result<Vec<PatternRecord>, sqlx::Error> {
        Ok(vec![
            self.detect_who(tenant_id, min_sample).await?,
            self.detect_what(tenant_id, min_sample).await?,
            self.detect_when(tenant_id, min_sample).await?,
            self.detect_how(tenant_id, min_sample).await?,
        ])
    }

    /// WHO: conversion-rate stratified by lead segment (spec §4.11).
    ///
    /// `conversions` = terminal `converted` assignments; `non_conversions` =
    /// terminal `not_interested`/`bounced`/`unsubscribed`/no-reply-exhausted.
    /// In-progress assignments are excluded from the denominator.
    async fn detect_who(
        &self,
        tenant_id: TenantId,
        min_sample: u32,
    ) -> Result<PatternRecord, sqlx::Error> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT \
                COALESCE(lp.industry, 'unknown') AS segment, \
                SUM(CASE WHEN a.status = 'converted' THEN 1 ELSE 0 END) AS conversions, \
                SUM(CASE WHEN a.status IN ('not_interested', 'archived') THEN 1 ELSE 0 END) AS non_conversions \
             FROM assignments a \
             JOIN lead_pool lp ON lp.id = a.lead_id \
             WHERE a.tenant_id = ?1 AND a.deleted_at IS NULL \
               AND a.status IN ('converted', 'not_interested', 'archived') \
             GROUP BY segment",
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let features = rows
            .into_iter()
            .filter_map(|(segment, conversions, non_conversions)| {
                #[allow(clippy::cast_sign_loss)]
                let conversions = conversions.max(0) as u32;
                #[allow(clippy::cast_sign_loss)]
                let non_conversions = non_conversions.max(0) as u32;
                let total = conversions + non_conversions;
                if total < min_sample {
                    return None;
                }
                let confidence = wilson_lower_bound(conversions, total);
                Some(PatternFeature {
                    feature: format!("industry:{segment}"),
                    lift: f64::from(conversions) / f64::from(total),
                    sample_size: total,
                    confidence,
                })
            })
            .collect();

        Ok(PatternRecord {
            id: crate::types::ids::PatternId::new(),
            tenant_id: Some(tenant_id),
            kind: PatternKind::Who,
            features,
            computed_at: Utc::now(),
        })
    }

    /// WHAT: subject-line/opener template correlation with reply-rate,
    /// read off the content snapshot persisted on each `sent` activity
    /// (spec §4.11).
    async fn detect_what(
        &self,
        tenant_id: TenantId,
        min_sample: u32,
    ) -> Result<PatternRecord, sqlx::Error> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT \
                COALESCE(json_extract(sent.content_json, '$.template_ref'), 'none') AS template, \
                COUNT(*) AS sent_count, \
                SUM(CASE WHEN EXISTS ( \
                    SELECT 1 FROM activities r \
                    WHERE r.assignment_id = sent.assignment_id AND r.action = 'replied' \
                ) THEN 1 ELSE 0 END) AS replied_count \
             FROM activities sent \
             WHERE sent.tenant_id = ?1 AND sent.action = 'sent' \
             GROUP BY template",
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let features = rows
            .into_iter()
            .filter_map(|(template, sent_count, replied_count)| {
                #[allow(clippy::cast_sign_loss)]
                let sent_count = sent_count.max(0) as u32;
                #[allow(clippy::cast_sign_loss)]
                let replied_count = replied_count.max(0) as u32;
                if sent_count < min_sample {
                    return None;
                }
                let confidence = wilson_lower_bound(replied_count, sent_count);
                Some(PatternFeature {
                    feature: format!("template:{template}"),
                    lift: f64::from(replied_count) / f64::from(sent_count),
                    sample_size: sent_count,
                    confidence,
                })
            })
            .collect();

        Ok(PatternRecord {
            id: crate::types::ids::PatternId::new(),
            tenant_id: Some(tenant_id),
            kind: PatternKind::What,
            features,
            computed_at: Utc::now(),
        })
    }

    /// WHEN: day-of-week × hour-of-day conversion lift (spec §4.11).
    async fn detect_when(
        &self,
        tenant_id: TenantId,
        min_sample: u32,
    ) -> Result<PatternRecord, sqlx::Error> {
        let rows: Vec<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT \
                strftime('%w', sent.occurred_at) AS dow, \
                strftime('%H', sent.occurred_at) AS hour, \
                COUNT(*) AS sent_count, \
                SUM(CASE WHEN EXISTS ( \
                    SELECT 1 FROM activities r \
                    WHERE r.assignment_id = sent.assignment_id AND r.action = 'replied' \
                ) THEN 1 ELSE 0 END) AS replied_count \
             FROM activities sent \
             WHERE sent.tenant_id = ?1 AND sent.action = 'sent' \
             GROUP BY dow, hour",
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let features = rows
            .into_iter()
            .filter_map(|(dow, hour, sent_count, replied_count)| {
                #[allow(clippy::cast_sign_loss)]
                let sent_count = sent_count.max(0) as u32;
                #[allow(clippy::cast_sign_loss)]
                let replied_count = replied_count.max(0) as u32;
                if sent_count < min_sample {
                    return None;
                }
                let confidence = wilson_lower_bound(replied_count, sent_count);
                Some(PatternFeature {
                    feature: format!("dow:{dow}:hour:{hour}"),
                    lift: f64::from(replied_count) / f64::from(sent_count),
                    sample_size: sent_count,
                    confidence,
                })
            })
            .collect();

        Ok(PatternRecord {
            id: crate::types::ids::PatternId::new(),
            tenant_id: Some(tenant_id),
            kind: PatternKind::When,
            features,
            computed_at: Utc::now(),
        })
    }

    /// HOW: channel and channel-sequence lift (spec §4.11).
    async fn detect_how(
        &self,
        tenant_id: TenantId,
        min_sample: u32,
    ) -> Result<PatternRecord, sqlx::Error> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT \
                sent.channel, \
                COUNT(*) AS sent_count, \
                SUM(CASE WHEN EXISTS ( \
                    SELECT 1 FROM activities r \
                    WHERE r.assignment_id = sent.assignment_id AND r.action = 'replied' \
                ) THEN 1 ELSE 0 END) AS replied_count \
             FROM activities sent \
             WHERE sent.tenant_id = ?1 AND sent.action = 'sent' \
             GROUP BY sent.channel",
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let features = rows
            .into_iter()
            .filter_map(|(channel, sent_count, replied_count)| {
                #[allow(clippy::cast_sign_loss)]
                let sent_count = sent_count.max(0) as u32;
                #[allow(clippy::cast_sign_loss)]
                let replied_count = replied_count.max(0) as u32;
                if sent_count < min_sample {
                    return None;
                }
                let confidence = wilson_lower_bound(replied_count, sent_count);
                Some(PatternFeature {
                    feature: format!("channel:{channel}"),
                    lift: f64::from(replied_count) / f64::from(sent_count),
                    sample_size: sent_count,
                    confidence,
                })
            })
            .collect();

        Ok(PatternRecord {
            id: crate::types::ids::PatternId::new(),
            tenant_id: Some(tenant_id),
            kind: PatternKind::How,
            features,
            computed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wilson_lower_bound_shrinks_with_small_samples() {
        let small = wilson_lower_bound(3, 3);
        let large = wilson_lower_bound(97, 100);
        assert!(small < large, "small={small} large={large}");
    }

    #[test]
    fn wilson_lower_bound_zero_sample_is_zero() {
        assert_eq!(wilson_lower_bound(0, 0), 0.0);
    }
}
