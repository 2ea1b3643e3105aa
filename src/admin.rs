//! Operator surface (spec §6.5): one-shot administrative actions invoked via
//! `agency-osd admin <command>`, acting directly on the shared database so
//! they take effect for every running `serve` process without a restart.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::types::ids::TenantId;
use crate::types::tenant::SubscriptionState;

/// Settings key gating the scheduler run loop.
pub const SCHEDULER_PAUSED_KEY: &str = "scheduler_paused";
/// Settings key overriding [`crate::config::CacheConfig::version_prefix`].
pub const CACHE_VERSION_KEY: &str = "cache_version_prefix";
/// Settings key overriding [`crate::config::TestModeConfig::enabled`].
pub const TEST_MODE_ENABLED_KEY: &str = "test_mode_enabled";

/// Reads one string-valued operator setting, falling back to `default` when unset.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn read_setting(
    db: &SqlitePool,
    key: &str,
    default: &str,
) -> Result<String, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM platform_settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(db)
            .await?;
    Ok(row.map_or_else(|| default.to_owned(), |(value,)| value))
}

async fn write_setting(db: &SqlitePool, key: &str, value: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO platform_settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(())
}

/// Pauses or resumes the scheduler globally (spec §6.5).
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn set_scheduler_paused(db: &SqlitePool, paused: bool) -> Result<(), sqlx::Error> {
    write_setting(db, SCHEDULER_PAUSED_KEY, if paused { "true" } else { "false" }).await
}

/// Whether the scheduler is currently paused (spec §6.5); `serve`'s run
/// loop checks this before every pass.
///
/// # Errors
///
/// Returns an error if the read fails.
pub async fn scheduler_paused(db: &SqlitePool) -> Result<bool, sqlx::Error> {
    Ok(read_setting(db, SCHEDULER_PAUSED_KEY, "false").await? == "true")
}

/// Pauses or resumes a single tenant by flipping its subscription state
/// between `Paused` and `Active` (spec §6.5) — the JIT validator's
/// subscription check already consults this field, so no separate flag is
/// needed.
///
/// # Errors
///
/// Returns an error if the tenant row cannot be updated.
pub async fn set_tenant_paused(
    db: &SqlitePool,
    tenant_id: TenantId,
    paused: bool,
) -> Result<(), sqlx::Error> {
    let state = if paused { SubscriptionState::Paused } else { SubscriptionState::Active };
    sqlx::query("UPDATE tenants SET subscription_state = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(state)
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .execute(db)
        .await?;
    Ok(())
}

/// Emergency-clears every rate ledger bucket (spec §6.5); resources regain
/// their full daily capacity immediately. Used when a provider misreports
/// usage or a bucket gets stuck after an incident.
///
/// # Errors
///
/// Returns an error if the delete fails.
pub async fn reset_rate_ledger(db: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM rate_ledger_buckets").execute(db).await?;
    Ok(result.rows_affected())
}

/// Bumps the cache version prefix, invalidating every cached entry without a
/// delete pass (spec §4.3, §6.5).
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn bump_cache_version(db: &SqlitePool, new_prefix: &str) -> Result<(), sqlx::Error> {
    write_setting(db, CACHE_VERSION_KEY, new_prefix).await
}

/// Toggles test mode (spec §6.5); `serve` reads this at startup to seed
/// [`crate::channels::test_mode::TestModeState`].
///
/// # Errors
///
/// Returns an error if the write fails.
pub async fn set_test_mode(db: &SqlitePool, enabled: bool) -> Result<(), sqlx::Error> {
    write_setting(db, TEST_MODE_ENABLED_KEY, if enabled { "true" } else { "false" }).await
}
