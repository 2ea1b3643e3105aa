//! Resource Pool integration tests (spec §4.4).

use crate::common;

use agency_os::channels::ChannelKind;
use agency_os::engines::rate_ledger::RateLedger;
use agency_os::engines::resource_pool::ResourcePool;
use agency_os::types::ids::{ResourceId, TenantId};
use chrono::Utc;

async fn insert_healthy_resource(
    db: &sqlx::SqlitePool,
    id: ResourceId,
    resource_type: &str,
    daily_cap: i64,
    last_used_at: Option<chrono::DateTime<Utc>>,
) {
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO resources \
         (id, resource_type, provider_id, health, last_used_at, usage_count, daily_cap, \
          created_at, updated_at) \
         VALUES (?1, ?2, 'provider-x', 'healthy', ?3, 0, ?4, ?5, ?5)",
    )
    .bind(id.to_string())
    .bind(resource_type)
    .bind(last_used_at)
    .bind(daily_cap)
    .bind(now)
    .execute(db)
    .await
    .expect("resource insert should succeed");
}

#[tokio::test]
async fn select_prefers_least_recently_used() {
    let db = common::test_pool().await;
    let tenant = TenantId::new();
    let older = ResourceId::new();
    let newer = ResourceId::new();
    let now = Utc::now();

    insert_healthy_resource(&db, newer, "email_domain", 50, Some(now)).await;
    insert_healthy_resource(&db, older, "email_domain", 50, Some(now - chrono::Duration::days(1)))
        .await;

    let pool = ResourcePool::new(db.clone(), RateLedger::new(db));
    let selected = pool
        .select(ChannelKind::Email, tenant, now)
        .await
        .expect("select should succeed")
        .expect("a candidate should be available");

    assert_eq!(selected.id, older);
}

#[tokio::test]
async fn select_and_reserve_exhausts_and_falls_through_to_next_candidate() {
    let db = common::test_pool().await;
    let tenant = TenantId::new();
    let now = Utc::now();
    let tight = ResourceId::new();
    let roomy = ResourceId::new();

    insert_healthy_resource(&db, tight, "phone_number_sms", 1, Some(now - chrono::Duration::days(2)))
        .await;
    insert_healthy_resource(&db, roomy, "phone_number_sms", 10, Some(now - chrono::Duration::days(1)))
        .await;

    let rate_ledger = RateLedger::new(db.clone());
    let pool = ResourcePool::new(db, rate_ledger);

    let (first, _) = pool
        .select_and_reserve(ChannelKind::Sms, tenant, now)
        .await
        .expect("reserve should succeed")
        .expect("a candidate should be available");
    assert_eq!(first.id, tight);

    let (second, _) = pool
        .select_and_reserve(ChannelKind::Sms, tenant, now)
        .await
        .expect("reserve should succeed")
        .expect("a candidate should be available");
    assert_eq!(second.id, roomy);
}

#[tokio::test]
async fn select_ignores_resources_leased_to_another_tenant() {
    let db = common::test_pool().await;
    let tenant_a = TenantId::new();
    let tenant_b = TenantId::new();
    let now = Utc::now();
    let leased = ResourceId::new();

    sqlx::query(
        "INSERT INTO resources \
         (id, resource_type, provider_id, health, usage_count, daily_cap, leased_to, \
          created_at, updated_at) \
         VALUES (?1, 'linkedin_seat', 'provider-x', 'healthy', 0, 17, ?2, ?3, ?3)",
    )
    .bind(leased.to_string())
    .bind(tenant_b.to_string())
    .bind(now)
    .execute(&db)
    .await
    .expect("resource insert should succeed");

    let pool = ResourcePool::new(db.clone(), RateLedger::new(db));
    let for_a = pool.select(ChannelKind::LinkedIn, tenant_a, now).await.expect("select should succeed");
    assert!(for_a.is_none());

    let for_b = pool.select(ChannelKind::LinkedIn, tenant_b, now).await.expect("select should succeed");
    assert!(for_b.is_some());
}
