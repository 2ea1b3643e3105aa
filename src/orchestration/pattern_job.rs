//! Pattern Learning Job — the weekly scheduled run of the Pattern Detectors,
//! persisting each tenant's freshly computed [`PatternRecord`]s (spec §4.11).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info};

use crate::engines::patterns::PatternDetectors;
use crate::types::ids::TenantId;
use crate::types::pattern::PatternRecord;

/// Runs all four detector families for every non-deleted tenant and persists
/// the results; detector failures for one tenant are logged and skipped so a
/// single bad segment never blocks the rest of the run.
///
/// # Errors
///
/// Returns an error only if the tenant roster itself cannot be read.
pub async fn run_once(db: &SqlitePool, min_sample: u32) -> Result<u32, sqlx::Error> {
    let detectors = PatternDetectors::new(db.clone());
    let tenant_ids: Vec<(String,)> =
        sqlx::query_as("SELECT id FROM tenants WHERE deleted_at IS NULL")
            .fetch_all(db)
            .await?;

    let mut persisted = 0_u32;
    for (id_str,) in tenant_ids {
        let Ok(tenant_id) = id_str.parse::<TenantId>() else { continue };
        match detectors.compute_all(tenant_id, min_sample).await {
            Ok(records) => {
                for record in records {
                    if let Err(err) = persist(db, &record).await {
                        error!(tenant = %tenant_id, %err, "failed to persist pattern record");
                        continue;
                    }
                    persisted += 1;
                }
            }
            Err(err) => error!(tenant = %tenant_id, %err, "pattern detection failed"),
        }
    }

    info!(persisted, "pattern learning job complete");
    Ok(persisted)
}

/// Overwrites the prior record for this `(tenant_id, kind)` pair (spec §3
/// lifecycle table: "Detectors (overwrite on next run)"), relying on the
/// `COALESCE(tenant_id, '')` unique index to treat platform-wide patterns
/// (`tenant_id IS NULL`) as a single slot per kind.
async fn persist(db: &SqlitePool, record: &PatternRecord) -> Result<(), sqlx::Error> {
    let features_json = serde_json::to_string(&record.features)
        .unwrap_or_else(|_| "[]".to_owned());
    sqlx::query(
        "INSERT INTO pattern_records (id, tenant_id, kind, features_json, computed_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) \
         ON CONFLICT (COALESCE(tenant_id, ''), kind) DO UPDATE SET \
             id = excluded.id, \
             features_json = excluded.features_json, \
             computed_at = excluded.computed_at, \
             updated_at = excluded.updated_at",
    )
    .bind(record.id.to_string())
    .bind(record.tenant_id.map(|t| t.to_string()))
    .bind(record.kind)
    .bind(features_json)
    .bind(record.computed_at)
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(())
}
