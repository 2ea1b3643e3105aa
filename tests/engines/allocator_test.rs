//! Lead Pool & Allocator integration tests (spec §4.6).

use crate::common;

use agency_os::engines::allocator::Allocator;
use agency_os::engines::suppression::SuppressionIndex;
use agency_os::types::campaign::{Campaign, CampaignStatus, SendWindow};
use agency_os::types::ids::{CampaignId, TenantId};
use agency_os::types::tenant::{IcpVector, PermissionMode, SubscriptionState, Tenant, TenantTier};
use chrono::Utc;

fn make_tenant() -> Tenant {
    let now = Utc::now();
    Tenant {
        id: TenantId::new(),
        display_name: "Acme".to_owned(),
        tier: TenantTier::Growth,
        subscription_state: SubscriptionState::Active,
        credits_remaining: 1000,
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

fn make_campaign(tenant_id: TenantId) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: CampaignId::new(),
        tenant_id,
        name: "Q3 outbound".to_owned(),
        status: CampaignStatus::Active,
        channel_allocation: vec![],
        permission_mode: PermissionMode::Autopilot,
        lead_quota: 200,
        sequence: vec![],
        send_window: SendWindow::default(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
async fn source_and_populate_skips_duplicates_by_natural_key() {
    let db = common::test_pool().await;
    let allocator = Allocator::new(db.clone(), SuppressionIndex::new(db), 0.70, 30);
    let tenant = TenantId::new();

    let candidates = vec![
        (Some("lead@example.com".to_owned()), None, None),
        (Some("lead@example.com".to_owned()), None, None),
    ];

    let counts = allocator
        .source_and_populate(tenant, &candidates)
        .await
        .expect("sourcing should succeed");

    assert_eq!(counts.inserted, 1);
    assert_eq!(counts.duplicate, 1);
    assert_eq!(counts.suppressed, 0);
}

#[tokio::test]
async fn source_and_populate_skips_suppressed_emails() {
    let db = common::test_pool().await;
    let suppression = SuppressionIndex::new(db.clone());
    let tenant = TenantId::new();

    suppression
        .suppress(
            None,
            agency_os::types::suppression::SuppressionScope::Global,
            agency_os::types::suppression::SuppressionKey::Email,
            "blocked@example.com",
            agency_os::types::suppression::SuppressionReason::DoNotContact,
        )
        .await
        .expect("suppress should succeed");

    let allocator = Allocator::new(db, suppression, 0.70, 30);
    let candidates = vec![(Some("blocked@example.com".to_owned()), None, None)];

    let counts = allocator
        .source_and_populate(tenant, &candidates)
        .await
        .expect("sourcing should succeed");

    assert_eq!(counts.inserted, 0);
    assert_eq!(counts.suppressed, 1);
}

#[tokio::test]
async fn allocate_assigns_each_lead_to_at_most_one_tenant() {
    let db = common::test_pool().await;
    let suppression = SuppressionIndex::new(db.clone());
    let tenant_a = make_tenant();
    let tenant_b = make_tenant();
    let campaign_a = make_campaign(tenant_a.id);
    let campaign_b = make_campaign(tenant_b.id);

    let allocator = Allocator::new(db.clone(), suppression, 0.70, 30);
    allocator
        .source_and_populate(
            tenant_a.id,
            &[
                (Some("one@example.com".to_owned()), None, None),
                (Some("two@example.com".to_owned()), None, None),
            ],
        )
        .await
        .expect("sourcing should succeed");

    let first = allocator.allocate(&tenant_a, &campaign_a, 10).await.expect("allocate a");
    assert_eq!(first.len(), 2);

    // The same two leads must not also be assignable to a different tenant.
    let second = allocator.allocate(&tenant_b, &campaign_b, 10).await.expect("allocate b");
    assert!(second.is_empty());
}
