//! JIT Validator integration tests — the thirteen ordered checks (spec §4.8).

use crate::common;

use agency_os::channels::ChannelKind;
use agency_os::engines::jit::{JitOutcome, JitThresholds, JitValidator};
use agency_os::engines::rate_ledger::RateLedger;
use agency_os::engines::resource_pool::ResourcePool;
use agency_os::engines::suppression::SuppressionIndex;
use agency_os::types::assignment::{Assignment, AssignmentStatus, SequenceStep};
use agency_os::types::campaign::{Campaign, CampaignStatus, SendWindow, SequenceDefinitionStep};
use agency_os::types::ids::{AssignmentId, CampaignId, LeadId, ResourceId, TenantId};
use agency_os::types::lead::{ContactIdentity, EnrichmentProvenance, Firmographics, LeadPoolRecord, LeadStatus};
use agency_os::types::resource::{Resource, ResourceHealth, ResourceType};
use agency_os::types::tenant::{IcpVector, PermissionMode, SubscriptionState, Tenant, TenantTier};
use chrono::Utc;
use sqlx::SqlitePool;

fn default_thresholds() -> JitThresholds {
    JitThresholds {
        min_touch_gap_days: 3,
        channel_cooldown_days: 14,
        email_warmup_days: 30,
        voice_min_als: 70,
        mail_min_als: 85,
    }
}

fn make_assignment(als_score: u32) -> Assignment {
    let now = Utc::now();
    Assignment {
        id: AssignmentId::new(),
        tenant_id: TenantId::new(),
        lead_id: LeadId::new(),
        campaign_id: CampaignId::new(),
        sequence_step: SequenceStep(1),
        status: AssignmentStatus::InSequence,
        last_touched_at: None,
        last_channel: None,
        retry_count: 0,
        als_score,
        personalization_refs: Vec::new(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn make_lead() -> LeadPoolRecord {
    let now = Utc::now();
    LeadPoolRecord {
        id: LeadId::new(),
        identity: ContactIdentity { email: Some("lead@example.com".to_owned()), ..Default::default() },
        firmographics: Firmographics::default(),
        provenance: EnrichmentProvenance::default(),
        email_status: None,
        status: LeadStatus::Enriched,
        provider_external_id: None,
        bounced: false,
        unsubscribed: false,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn make_tenant(onboarded_days_ago: i64) -> Tenant {
    let now = Utc::now();
    Tenant {
        id: TenantId::new(),
        display_name: "Acme".to_owned(),
        tier: TenantTier::Growth,
        subscription_state: SubscriptionState::Active,
        credits_remaining: 10,
        permission_mode: PermissionMode::Autopilot,
        icp: IcpVector::default(),
        webhook_url: None,
        webhook_failure_streak: 0,
        onboarded_at: now - chrono::Duration::days(onboarded_days_ago),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn make_campaign() -> Campaign {
    let now = Utc::now();
    Campaign {
        id: CampaignId::new(),
        tenant_id: TenantId::new(),
        name: "Q3 outbound".to_owned(),
        status: CampaignStatus::Active,
        channel_allocation: vec![],
        permission_mode: PermissionMode::Autopilot,
        lead_quota: 100,
        sequence: vec![SequenceDefinitionStep { step: 1, channel: ChannelKind::Email, wait_days: 0 }],
        send_window: SendWindow::default(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

async fn insert_healthy_resource(db: &SqlitePool, resource_type: &str, daily_cap: i64) -> ResourceId {
    let id = ResourceId::new();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO resources \
         (id, resource_type, provider_id, health, usage_count, daily_cap, created_at, updated_at) \
         VALUES (?1, ?2, 'provider-x', 'healthy', 0, ?3, ?4, ?4)",
    )
    .bind(id.to_string())
    .bind(resource_type)
    .bind(daily_cap)
    .bind(now)
    .execute(db)
    .await
    .expect("resource insert should succeed");
    id
}

fn make_validator(db: SqlitePool) -> JitValidator {
    let suppression = SuppressionIndex::new(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), RateLedger::new(db.clone()));
    JitValidator::new(db, suppression, resource_pool, default_thresholds())
}

#[tokio::test]
async fn allows_a_clean_candidate_and_reserves_a_resource() {
    let db = common::test_pool().await;
    insert_healthy_resource(&db, "email_domain", 50).await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Allow { .. }));
}

#[tokio::test]
async fn rejects_non_sendable_assignment_status_as_fatal() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let mut assignment = make_assignment(90);
    assignment.status = AssignmentStatus::New;
    let lead = make_lead();
    let tenant = make_tenant(60);
    let campaign = make_campaign();

    let result = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn rejects_cancelled_subscription() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let mut tenant = make_tenant(60);
    tenant.subscription_state = SubscriptionState::Cancelled;
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_tenant_out_of_credits() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let mut tenant = make_tenant(60);
    tenant.credits_remaining = 0;
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_inactive_campaign() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let mut campaign = make_campaign();
    campaign.status = CampaignStatus::Paused;

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_manual_permission_mode() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let mut campaign = make_campaign();
    campaign.permission_mode = PermissionMode::Manual;

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_globally_bounced_lead() {
    let db = common::test_pool().await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let mut lead = make_lead();
    lead.bounced = true;
    let tenant = make_tenant(60);
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_voice_below_als_floor_and_allows_at_floor() {
    let db = common::test_pool().await;
    insert_healthy_resource(&db, "phone_number_voice", 50).await;
    let validator = make_validator(db);

    let assignment = make_assignment(69);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let mut campaign = make_campaign();
    campaign.sequence = vec![SequenceDefinitionStep { step: 1, channel: ChannelKind::Voice, wait_days: 0 }];

    let below = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Voice, 69, false, Utc::now())
        .await
        .expect("validate should succeed");
    assert!(matches!(below, JitOutcome::Reject(_)));

    let at_floor = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Voice, 70, false, Utc::now())
        .await
        .expect("validate should succeed");
    assert!(matches!(at_floor, JitOutcome::Allow { .. }));
}

#[tokio::test]
async fn rejects_mail_below_als_floor() {
    let db = common::test_pool().await;
    insert_healthy_resource(&db, "mail_sender", 1000).await;
    let validator = make_validator(db);

    let assignment = make_assignment(84);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let mut campaign = make_campaign();
    campaign.sequence = vec![SequenceDefinitionStep { step: 1, channel: ChannelKind::Mail, wait_days: 0 }];

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Mail, 84, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn email_als_gate_does_not_apply() {
    let db = common::test_pool().await;
    insert_healthy_resource(&db, "email_domain", 50).await;
    let validator = make_validator(db);

    let assignment = make_assignment(5);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 5, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Allow { .. }));
}

#[tokio::test]
async fn rejects_when_no_resource_has_headroom() {
    let db = common::test_pool().await;
    // daily_cap 0 means effective_cap is 0, so no candidate ever has headroom.
    insert_healthy_resource(&db, "email_domain", 0).await;
    let validator = make_validator(db);

    let assignment = make_assignment(90);
    let lead = make_lead();
    let tenant = make_tenant(60);
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, Utc::now())
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}

#[tokio::test]
async fn rejects_unwarmed_email_resource_for_a_newly_onboarded_tenant() {
    let db = common::test_pool().await;
    let id = ResourceId::new();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO resources \
         (id, resource_type, provider_id, health, usage_count, daily_cap, warming_since, \
          created_at, updated_at) \
         VALUES (?1, 'email_domain', 'provider-x', 'warming', 0, 50, ?2, ?2, ?2)",
    )
    .bind(id.to_string())
    .bind(now)
    .execute(&db)
    .await
    .expect("resource insert should succeed");

    let validator = make_validator(db);
    let assignment = make_assignment(90);
    let lead = make_lead();
    let tenant = make_tenant(1);
    let campaign = make_campaign();

    let outcome = validator
        .validate(&assignment, &lead, &tenant, &campaign, ChannelKind::Email, 90, false, now)
        .await
        .expect("validate should succeed");

    assert!(matches!(outcome, JitOutcome::Reject(_)));
}
