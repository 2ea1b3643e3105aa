//! Operator surface integration tests (spec §6.5).

mod common;

use agency_os::admin;
use agency_os::types::ids::TenantId;
use agency_os::types::tenant::{IcpVector, PermissionMode, SubscriptionState, Tenant, TenantTier};
use chrono::Utc;
use sqlx::SqlitePool;

async fn insert_tenant(db: &SqlitePool, tenant: &Tenant) {
    sqlx::query(
        "INSERT INTO tenants \
         (id, display_name, tier, subscription_state, credits_remaining, permission_mode, \
          onboarded_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
    )
    .bind(tenant.id.to_string())
    .bind(&tenant.display_name)
    .bind(tenant.tier)
    .bind(tenant.subscription_state)
    .bind(tenant.credits_remaining)
    .bind(tenant.permission_mode)
    .bind(tenant.onboarded_at)
    .execute(db)
    .await
    .expect("tenant insert should succeed");
}

fn make_tenant() -> Tenant {
    let now = Utc::now();
    Tenant {
        id: TenantId::new(),
        display_name: "Acme".to_owned(),
        tier: TenantTier::Starter,
        subscription_state: SubscriptionState::Active,
        credits_remaining: 10,
        permission_mode: PermissionMode::Autopilot,
        icp: IcpVector::default(),
        webhook_url: None,
        webhook_failure_streak: 0,
        onboarded_at: now,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
async fn scheduler_pause_defaults_to_false_and_round_trips() {
    let db = common::test_pool().await;
    assert!(!admin::scheduler_paused(&db).await.expect("read should succeed"));

    admin::set_scheduler_paused(&db, true).await.expect("pause should succeed");
    assert!(admin::scheduler_paused(&db).await.expect("read should succeed"));

    admin::set_scheduler_paused(&db, false).await.expect("resume should succeed");
    assert!(!admin::scheduler_paused(&db).await.expect("read should succeed"));
}

#[tokio::test]
async fn tenant_pause_flips_subscription_state_and_resume_restores_active() {
    let db = common::test_pool().await;
    let tenant = make_tenant();
    insert_tenant(&db, &tenant).await;

    admin::set_tenant_paused(&db, tenant.id, true).await.expect("pause should succeed");
    let (state,): (String,) =
        sqlx::query_as("SELECT subscription_state FROM tenants WHERE id = ?1")
            .bind(tenant.id.to_string())
            .fetch_one(&db)
            .await
            .expect("read should succeed");
    assert_eq!(state, "paused");

    admin::set_tenant_paused(&db, tenant.id, false).await.expect("resume should succeed");
    let (state,): (String,) =
        sqlx::query_as("SELECT subscription_state FROM tenants WHERE id = ?1")
            .bind(tenant.id.to_string())
            .fetch_one(&db)
            .await
            .expect("read should succeed");
    assert_eq!(state, "active");
}

#[tokio::test]
async fn bump_cache_version_overrides_the_configured_default() {
    let db = common::test_pool().await;
    let initial = admin::read_setting(&db, admin::CACHE_VERSION_KEY, "v1").await.expect("read");
    assert_eq!(initial, "v1");

    admin::bump_cache_version(&db, "v2").await.expect("bump should succeed");
    let bumped = admin::read_setting(&db, admin::CACHE_VERSION_KEY, "v1").await.expect("read");
    assert_eq!(bumped, "v2");
}

#[tokio::test]
async fn reset_rate_ledger_clears_every_bucket() {
    let db = common::test_pool().await;
    sqlx::query("INSERT INTO rate_ledger_buckets (resource_id, hour_bucket, count) VALUES ('r1', '2026-07-30T12', 4)")
        .execute(&db)
        .await
        .expect("seed insert should succeed");

    let cleared = admin::reset_rate_ledger(&db).await.expect("reset should succeed");
    assert_eq!(cleared, 1);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rate_ledger_buckets")
        .fetch_one(&db)
        .await
        .expect("count should succeed");
    assert_eq!(count, 0);
}
