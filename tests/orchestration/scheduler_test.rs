//! Outreach Scheduler integration tests (spec §4.9, §8 scenario 1).

use crate::common;

use std::collections::HashMap;
use std::sync::Arc;

use agency_os::channels::{
    CanonicalInboundMessage, ChannelDriver, ChannelError, ChannelKind, OutboundContent, SendOutcome,
};
use agency_os::engines::jit::{JitThresholds, JitValidator};
use agency_os::engines::rate_ledger::RateLedger;
use agency_os::engines::resource_pool::ResourcePool;
use agency_os::engines::suppression::SuppressionIndex;
use agency_os::orchestration::scheduler::{dispatch_candidate, DispatchOutcome};
use agency_os::types::assignment::{Assignment, AssignmentStatus, SequenceStep};
use agency_os::types::campaign::{Campaign, CampaignStatus, SendWindow, SequenceDefinitionStep};
use agency_os::types::ids::{AssignmentId, CampaignId, LeadId, ResourceId, TenantId};
use agency_os::types::lead::{ContactIdentity, EnrichmentProvenance, Firmographics, LeadPoolRecord, LeadStatus};
use agency_os::types::resource::Resource;
use agency_os::types::tenant::{IcpVector, PermissionMode, SubscriptionState, Tenant, TenantTier};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

struct StubDriver {
    outcome: SendOutcome,
}

#[async_trait]
impl ChannelDriver for StubDriver {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        _resource: &Resource,
        _address: &str,
        _content: &OutboundContent,
    ) -> Result<SendOutcome, ChannelError> {
        Ok(self.outcome.clone())
    }

    async fn ingest(
        &self,
        _webhook_payload: &serde_json::Value,
    ) -> Result<Option<CanonicalInboundMessage>, ChannelError> {
        Ok(None)
    }
}

fn drivers(outcome: SendOutcome) -> HashMap<ChannelKind, Arc<dyn ChannelDriver>> {
    let mut map: HashMap<ChannelKind, Arc<dyn ChannelDriver>> = HashMap::new();
    map.insert(ChannelKind::Email, Arc::new(StubDriver { outcome }));
    map
}

fn default_thresholds() -> JitThresholds {
    JitThresholds {
        min_touch_gap_days: 3,
        channel_cooldown_days: 14,
        email_warmup_days: 30,
        voice_min_als: 70,
        mail_min_als: 85,
    }
}

fn make_assignment() -> Assignment {
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
        als_score: 90,
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

fn make_tenant() -> Tenant {
    let now = Utc::now();
    Tenant {
        id: TenantId::new(),
        display_name: "Acme".to_owned(),
        tier: TenantTier::Growth,
        subscription_state: SubscriptionState::Active,
        credits_remaining: 100,
        permission_mode: PermissionMode::Autopilot,
        icp: IcpVector::default(),
        webhook_url: None,
        webhook_failure_streak: 0,
        onboarded_at: now - chrono::Duration::days(60),
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

async fn insert_tenant(db: &SqlitePool, tenant: &Tenant) {
    sqlx::query(
        "INSERT INTO tenants \
         (id, display_name, tier, subscription_state, credits_remaining, permission_mode, \
          icp_json, webhook_failure_streak, onboarded_at, created_at, updated_at) \
         VALUES (?1, ?2, 'growth', 'active', ?3, 'autopilot', '{}', 0, ?4, ?4, ?4)",
    )
    .bind(tenant.id.to_string())
    .bind(&tenant.display_name)
    .bind(tenant.credits_remaining)
    .bind(tenant.onboarded_at)
    .execute(db)
    .await
    .expect("tenant insert should succeed");
}

async fn insert_healthy_email_resource(db: &SqlitePool) -> ResourceId {
    let id = ResourceId::new();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO resources \
         (id, resource_type, provider_id, health, usage_count, daily_cap, created_at, updated_at) \
         VALUES (?1, 'email_domain', 'provider-x', 'healthy', 0, 50, ?2, ?2)",
    )
    .bind(id.to_string())
    .bind(now)
    .execute(db)
    .await
    .expect("resource insert should succeed");
    id
}

fn make_jit(db: SqlitePool) -> JitValidator {
    let suppression = SuppressionIndex::new(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), RateLedger::new(db.clone()));
    JitValidator::new(db, suppression, resource_pool, default_thresholds())
}

#[tokio::test]
async fn successful_send_advances_assignment_marks_resource_used_and_consumes_a_credit() {
    let db = common::test_pool().await;
    insert_healthy_email_resource(&db).await;
    let tenant = make_tenant();
    insert_tenant(&db, &tenant).await;

    let assignment = make_assignment();
    let lead = make_lead();
    let campaign = make_campaign();
    let jit = make_jit(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), RateLedger::new(db.clone()));
    let driver_map = drivers(SendOutcome::Ok { provider_msg_id: "msg-1".to_owned() });
    let content = OutboundContent {
        subject: None,
        body: String::new(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = dispatch_candidate(
        &db,
        &jit,
        &driver_map,
        &resource_pool,
        &assignment,
        &lead,
        &tenant,
        &campaign,
        ChannelKind::Email,
        "lead@example.com",
        &content,
        90,
        Utc::now(),
    )
    .await
    .expect("dispatch should succeed");

    assert!(matches!(outcome, DispatchOutcome::Sent { channel: ChannelKind::Email }));

    let remaining: (i64,) = sqlx::query_as("SELECT credits_remaining FROM tenants WHERE id = ?1")
        .bind(tenant.id.to_string())
        .fetch_one(&db)
        .await
        .expect("tenant should exist");
    assert_eq!(remaining.0, 99);

    let usage: (i64,) = sqlx::query_as("SELECT usage_count FROM resources WHERE resource_type = 'email_domain'")
        .fetch_one(&db)
        .await
        .expect("resource should exist");
    assert_eq!(usage.0, 1);
}

#[tokio::test]
async fn jit_rejection_does_not_touch_credits_or_resource_usage() {
    let db = common::test_pool().await;
    insert_healthy_email_resource(&db).await;
    let mut tenant = make_tenant();
    tenant.subscription_state = SubscriptionState::Cancelled;
    insert_tenant(&db, &tenant).await;

    let assignment = make_assignment();
    let lead = make_lead();
    let campaign = make_campaign();
    let jit = make_jit(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), RateLedger::new(db.clone()));
    let driver_map = drivers(SendOutcome::Ok { provider_msg_id: "msg-1".to_owned() });
    let content = OutboundContent {
        subject: None,
        body: String::new(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let outcome = dispatch_candidate(
        &db,
        &jit,
        &driver_map,
        &resource_pool,
        &assignment,
        &lead,
        &tenant,
        &campaign,
        ChannelKind::Email,
        "lead@example.com",
        &content,
        90,
        Utc::now(),
    )
    .await
    .expect("dispatch should succeed");

    assert!(matches!(outcome, DispatchOutcome::Rejected));

    let remaining: (i64,) = sqlx::query_as("SELECT credits_remaining FROM tenants WHERE id = ?1")
        .bind(tenant.id.to_string())
        .fetch_one(&db)
        .await
        .expect("tenant should exist");
    assert_eq!(remaining.0, 100);
}

#[tokio::test]
async fn missing_driver_for_channel_is_a_fatal_error() {
    let db = common::test_pool().await;
    insert_healthy_email_resource(&db).await;
    let tenant = make_tenant();
    insert_tenant(&db, &tenant).await;

    let assignment = make_assignment();
    let lead = make_lead();
    let campaign = make_campaign();
    let jit = make_jit(db.clone());
    let resource_pool = ResourcePool::new(db.clone(), RateLedger::new(db.clone()));
    let empty_drivers: HashMap<ChannelKind, Arc<dyn ChannelDriver>> = HashMap::new();
    let content = OutboundContent {
        subject: None,
        body: String::new(),
        in_reply_to: None,
        personalization_refs: vec![],
    };

    let result = dispatch_candidate(
        &db,
        &jit,
        &empty_drivers,
        &resource_pool,
        &assignment,
        &lead,
        &tenant,
        &campaign,
        ChannelKind::Email,
        "lead@example.com",
        &content,
        90,
        Utc::now(),
    )
    .await;

    assert!(result.is_err());
}
