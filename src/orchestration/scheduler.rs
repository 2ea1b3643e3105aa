//! Outreach Scheduler — the periodic batch dispatcher (spec §4.9).
//!
//! Composes the engines (never holds engine-to-engine references itself,
//! per spec §9): queries due candidates, runs each through the JIT
//! Validator, and invokes the matching channel driver. Concurrency within a
//! run is bounded by a semaphore; a per-process advisory lock on the
//! assignment id closes the small race window JIT leaves open (spec §5) —
//! best-effort only, the activity log remains the ground truth.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, warn};

use crate::channels::{ChannelDriver, ChannelError, ChannelKind, OutboundContent, SendOutcome};
use crate::engines::jit::JitValidator;
use crate::engines::jit::JitOutcome;
use crate::engines::resource_pool::ResourcePool;
use crate::error::DispatchError;
use crate::types::assignment::{Assignment, AssignmentStatus};
use crate::types::campaign::{Campaign, CampaignStatus};
use crate::types::ids::{AssignmentId, CampaignId, LeadId, TenantId};
use crate::types::lead::LeadPoolRecord;
use crate::types::tenant::{SubscriptionState, Tenant};

/// A due candidate pulled from storage (spec §4.9 step 1), resolved to its
/// full rows before JIT runs.
struct Candidate {
    assignment: Assignment,
    lead: LeadPoolRecord,
    tenant: Tenant,
    campaign: Campaign,
}

/// Outcome of dispatching a single candidate through JIT + driver (spec
/// §4.9 step 3).
#[derive(Debug, Clone, Copy)]
pub enum DispatchOutcome {
    Sent { channel: ChannelKind },
    Rejected,
    Failed,
    Retried,
}

/// Per-channel send counts returned by a scheduler run (spec §4.9 step 4).
#[derive(Debug, Clone, Default)]
pub struct RunCounts {
    pub sent: HashMap<ChannelKind, u32>,
    pub rejected: u32,
    pub failed: u32,
    pub retried: u32,
}

impl RunCounts {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent { channel } => *self.sent.entry(channel).or_insert(0) += 1,
            DispatchOutcome::Rejected => self.rejected += 1,
            DispatchOutcome::Failed => self.failed += 1,
            DispatchOutcome::Retried => self.retried += 1,
        }
    }
}

/// The Outreach Scheduler (spec §4.9).
pub struct Scheduler {
    db: SqlitePool,
    jit: Arc<JitValidator>,
    drivers: Arc<HashMap<ChannelKind, Arc<dyn ChannelDriver>>>,
    resource_pool: Arc<ResourcePool>,
    in_flight: Arc<Mutex<HashSet<AssignmentId>>>,
    batch_size: u32,
    max_parallel: usize,
}

impl Scheduler {
    pub fn new(
        db: SqlitePool,
        jit: JitValidator,
        drivers: HashMap<ChannelKind, Arc<dyn ChannelDriver>>,
        resource_pool: ResourcePool,
        batch_size: u32,
        max_parallel: usize,
    ) -> Self {
        Self {
            db,
            jit: Arc::new(jit),
            drivers: Arc::new(drivers),
            resource_pool: Arc::new(resource_pool),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            batch_size,
            max_parallel,
        }
    }

    /// Runs one scheduler pass (spec §4.9 algorithm, steps 1–4).
    ///
    /// Each eligible candidate is dispatched on its own task, bounded to
    /// `max_parallel` concurrent sends by a semaphore; the advisory lock
    /// keeps a given assignment from being picked up twice within the run.
    ///
    /// # Errors
    ///
    /// Returns an error if the candidate query fails. Per-candidate
    /// failures are recorded as activities and never abort the run.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunCounts, sqlx::Error> {
        let candidates = self.due_candidates(now).await?;
        debug!(count = candidates.len(), "scheduler run: candidates selected");

        let semaphore = Arc::new(Semaphore::new(self.max_parallel.max(1)));
        let mut tasks = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !Self::in_send_window(&candidate.campaign, now.naive_utc()) {
                continue;
            }

            let assignment_id = candidate.assignment.id;
            {
                let mut in_flight = self.in_flight.lock().await;
                if !in_flight.insert(assignment_id) {
                    continue;
                }
            }

            let permit = Arc::clone(&semaphore);
            let db = self.db.clone();
            let jit = Arc::clone(&self.jit);
            let drivers = Arc::clone(&self.drivers);
            let resource_pool = Arc::clone(&self.resource_pool);
            let in_flight = Arc::clone(&self.in_flight);

            tasks.push(tokio::spawn(async move {
                let outcome =
                    dispatch_candidate_owned(permit, db, &jit, &drivers, &resource_pool, candidate, now)
                        .await;
                in_flight.lock().await.remove(&assignment_id);
                outcome
            }));
        }

        let mut counts = RunCounts::default();
        for task in tasks {
            match task.await {
                Ok(Ok(outcome)) => counts.record(outcome),
                Ok(Err(err)) => error!(%err, "candidate dispatch failed"),
                Err(join_err) => error!(%join_err, "dispatch task panicked"),
            }
        }

        Ok(counts)
    }

    async fn due_candidates(&self, now: DateTime<Utc>) -> Result<Vec<Candidate>, sqlx::Error> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            "SELECT a.id, a.tenant_id, a.lead_id, a.campaign_id \
             FROM assignments a \
             JOIN tenants t ON t.id = a.tenant_id \
             JOIN campaigns c ON c.id = a.campaign_id \
             WHERE a.deleted_at IS NULL AND a.status = 'in_sequence' \
               AND t.subscription_state IN ('active', 'trialing') AND t.credits_remaining > 0 \
               AND c.status = 'active' \
             ORDER BY a.last_touched_at IS NOT NULL, a.last_touched_at ASC \
             LIMIT ?1",
        )
        .bind(i64::from(self.batch_size))
        .fetch_all(&self.db)
        .await?;

        let mut candidates = Vec::with_capacity(rows.len());
        for (assignment_id, _tenant_id, _lead_id, _campaign_id) in rows {
            let Ok(assignment_id) = assignment_id.parse::<AssignmentId>() else { continue };
            if let Some(candidate) = self.load_candidate(assignment_id).await? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }

    async fn load_candidate(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Option<Candidate>, sqlx::Error> {
        let Some(assignment) = load_assignment(&self.db, assignment_id).await? else {
            return Ok(None);
        };
        let Some(lead) = load_lead(&self.db, assignment.lead_id).await? else { return Ok(None) };
        let Some(tenant) = load_tenant(&self.db, assignment.tenant_id).await? else {
            return Ok(None);
        };
        let Some(campaign) = load_campaign(&self.db, assignment.campaign_id).await? else {
            return Ok(None);
        };
        Ok(Some(Candidate { assignment, lead, tenant, campaign }))
    }

    /// Whether `now_local` falls inside `campaign`'s business-hours send
    /// window (spec §4.9). Timezone conversion from UTC to the campaign's
    /// configured zone is the caller's responsibility; this takes an
    /// already-localized timestamp.
    pub fn in_send_window(campaign: &Campaign, now_local: chrono::NaiveDateTime) -> bool {
        let weekday = now_local.weekday().number_from_monday();
        #[allow(clippy::cast_possible_truncation)]
        let weekday = weekday as u8;
        if !campaign.send_window.active_weekdays.contains(&weekday) {
            return false;
        }
        let t = now_local.time();
        t >= campaign.send_window.start_local && t <= campaign.send_window.end_local
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_candidate_owned(
    permit: Arc<Semaphore>,
    db: SqlitePool,
    jit: &JitValidator,
    drivers: &HashMap<ChannelKind, Arc<dyn ChannelDriver>>,
    resource_pool: &ResourcePool,
    candidate: Candidate,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome, DispatchError> {
    let _permit = permit.acquire_owned().await.map_err(|e| DispatchError::Fatal(e.to_string()))?;

    let Candidate { assignment, lead, tenant, campaign } = candidate;
    let Some(step_def) = campaign.step_definition(assignment.sequence_step.0) else {
        return Ok(DispatchOutcome::Failed);
    };
    let channel = step_def.channel;

    let Some(address) = dispatch_address(&lead, channel) else {
        return Ok(DispatchOutcome::Failed);
    };

    let content = OutboundContent {
        subject: None,
        body: String::new(),
        in_reply_to: None,
        personalization_refs: assignment.personalization_refs.clone(),
    };

    // Computed once at allocation time and persisted on the assignment
    // (spec §4.7); the JIT channel ALS gate reads it from here.
    let als_score = assignment.als_score;

    dispatch_candidate(
        &db, jit, drivers, resource_pool, &assignment, &lead, &tenant, &campaign, channel, &address,
        &content, als_score, now,
    )
    .await
}

fn dispatch_address(lead: &LeadPoolRecord, channel: ChannelKind) -> Option<String> {
    match channel {
        ChannelKind::Email => lead.identity.email.clone(),
        ChannelKind::Sms | ChannelKind::Voice => lead.identity.phone.clone(),
        ChannelKind::LinkedIn => lead.identity.linkedin_url.clone(),
        ChannelKind::Mail => lead.identity.email.clone(),
    }
}

/// Dispatches one candidate end-to-end: JIT validate, invoke the matching
/// driver, append the resulting activity, and advance or fail the
/// assignment (spec §4.9 step 3).
///
/// # Errors
///
/// Returns an error if a required channel driver is missing or an
/// underlying database operation fails.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch_candidate(
    db: &SqlitePool,
    jit: &JitValidator,
    drivers: &HashMap<ChannelKind, Arc<dyn ChannelDriver>>,
    resource_pool: &ResourcePool,
    assignment: &Assignment,
    lead: &LeadPoolRecord,
    tenant: &Tenant,
    campaign: &Campaign,
    channel: ChannelKind,
    address: &str,
    content: &OutboundContent,
    als_score: u32,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome, DispatchError> {
    if tenant.subscription_state == SubscriptionState::Cancelled {
        return Ok(DispatchOutcome::Rejected);
    }

    let outcome = jit
        .validate(assignment, lead, tenant, campaign, channel, als_score, false, now)
        .await?;

    let resource = match outcome {
        JitOutcome::Allow { resource } => resource,
        JitOutcome::Reject(reason) => {
            record_activity(
                db,
                tenant.id,
                lead.id,
                assignment.id,
                channel,
                crate::types::activity::ActivityAction::Rejected,
                None,
                assignment.sequence_step.0,
                Some(reason.as_str().to_owned()),
                now,
            )
            .await?;
            return Ok(DispatchOutcome::Rejected);
        }
    };

    let Some(driver) = drivers.get(&channel) else {
        return Err(DispatchError::Fatal(format!("no channel driver registered for {channel:?}")));
    };

    match driver.send(&resource, address, content).await {
        Ok(SendOutcome::Ok { provider_msg_id }) => {
            record_activity(
                db,
                tenant.id,
                lead.id,
                assignment.id,
                channel,
                crate::types::activity::ActivityAction::Sent,
                Some(provider_msg_id),
                assignment.sequence_step.0,
                None,
                now,
            )
            .await?;
            advance_assignment(db, assignment.id, now).await?;
            resource_pool.mark_used(resource.id, now).await;
            consume_credit(db, tenant.id).await?;
            Ok(DispatchOutcome::Sent { channel })
        }
        Ok(SendOutcome::TransientErr { detail }) => {
            warn!(assignment_id = %assignment.id, %detail, "transient driver error, reserve released");
            Ok(DispatchOutcome::Retried)
        }
        Ok(SendOutcome::PermanentErr { detail }) => {
            record_activity(
                db,
                tenant.id,
                lead.id,
                assignment.id,
                channel,
                crate::types::activity::ActivityAction::Failed,
                None,
                assignment.sequence_step.0,
                Some(detail),
                now,
            )
            .await?;
            Ok(DispatchOutcome::Failed)
        }
        Ok(SendOutcome::RejectedDncr { detail }) => {
            record_activity(
                db,
                tenant.id,
                lead.id,
                assignment.id,
                channel,
                crate::types::activity::ActivityAction::Rejected,
                None,
                assignment.sequence_step.0,
                Some(detail),
                now,
            )
            .await?;
            Ok(DispatchOutcome::Rejected)
        }
        Err(ChannelError::Transport(detail) | ChannelError::MalformedPayload(detail)) => {
            warn!(assignment_id = %assignment.id, %detail, "driver transport failure");
            Ok(DispatchOutcome::Retried)
        }
        Err(ChannelError::Ignored(_)) => Ok(DispatchOutcome::Failed),
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn record_activity(
    db: &SqlitePool,
    tenant_id: TenantId,
    lead_id: LeadId,
    assignment_id: AssignmentId,
    channel: ChannelKind,
    action: crate::types::activity::ActivityAction,
    provider_message_id: Option<String>,
    sequence_step: u32,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activities \
         (id, tenant_id, lead_id, assignment_id, channel, action, provider_message_id, \
          content_json, sequence_step, reason, occurred_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '{}', ?8, ?9, ?10)",
    )
    .bind(crate::types::ids::ActivityId::new().to_string())
    .bind(tenant_id.to_string())
    .bind(lead_id.to_string())
    .bind(assignment_id.to_string())
    .bind(channel.as_str())
    .bind(action_str(action))
    .bind(provider_message_id)
    .bind(i64::from(sequence_step))
    .bind(reason)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

/// Debits one send credit from `tenant_id` on a successful dispatch (spec
/// §8 scenario 1: "T.credits=99" after one send). Floored at zero so a
/// race with another dispatch never drives the balance negative.
async fn consume_credit(db: &SqlitePool, tenant_id: TenantId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE tenants SET credits_remaining = MAX(credits_remaining - 1, 0) WHERE id = ?1",
    )
    .bind(tenant_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

async fn advance_assignment(
    db: &SqlitePool,
    assignment_id: AssignmentId,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE assignments SET sequence_step = sequence_step + 1, \
         status = 'in_sequence', last_touched_at = ?1, updated_at = ?2 WHERE id = ?3",
    )
    .bind(now)
    .bind(now)
    .bind(assignment_id.to_string())
    .execute(db)
    .await?;
    Ok(())
}

fn action_str(action: crate::types::activity::ActivityAction) -> &'static str {
    use crate::types::activity::ActivityAction;
    match action {
        ActivityAction::Sent => "sent",
        ActivityAction::Delivered => "delivered",
        ActivityAction::Opened => "opened",
        ActivityAction::Clicked => "clicked",
        ActivityAction::Replied => "replied",
        ActivityAction::Bounced => "bounced",
        ActivityAction::Rejected => "rejected",
        ActivityAction::Failed => "failed",
    }
}

async fn load_assignment(
    db: &SqlitePool,
    id: AssignmentId,
) -> Result<Option<Assignment>, sqlx::Error> {
    #[allow(clippy::type_complexity)]
    let row: Option<(String, String, String, String, i64, String, Option<DateTime<Utc>>, Option<String>, i64, i64, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, tenant_id, lead_id, campaign_id, sequence_step, status, \
                    last_touched_at, last_channel, retry_count, als_score, created_at, updated_at \
             FROM assignments WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    Ok(row.and_then(
        |(id, tenant_id, lead_id, campaign_id, step, status, last_touched_at, last_channel, retry_count, als_score, created_at, updated_at)| {
            Some(Assignment {
                id: id.parse().ok()?,
                tenant_id: tenant_id.parse().ok()?,
                lead_id: lead_id.parse().ok()?,
                campaign_id: campaign_id.parse().ok()?,
                #[allow(clippy::cast_sign_loss)]
                sequence_step: crate::types::assignment::SequenceStep(step.max(0) as u32),
                status: parse_assignment_status(&status),
                last_touched_at,
                last_channel: last_channel.and_then(|c| parse_channel(&c)),
                #[allow(clippy::cast_sign_loss)]
                retry_count: retry_count.max(0) as u32,
                #[allow(clippy::cast_sign_loss)]
                als_score: als_score.max(0) as u32,
                personalization_refs: Vec::new(),
                created_at,
                updated_at,
                deleted_at: None,
            })
        },
    ))
}

fn parse_assignment_status(s: &str) -> AssignmentStatus {
    match s {
        "enriched" => AssignmentStatus::Enriched,
        "replied" => AssignmentStatus::Replied,
        "meeting_booked" => AssignmentStatus::MeetingBooked,
        "converted" => AssignmentStatus::Converted,
        "not_interested" => AssignmentStatus::NotInterested,
        "out_of_office" => AssignmentStatus::OutOfOffice,
        "archived" => AssignmentStatus::Archived,
        _ => AssignmentStatus::New,
    }
}

fn parse_channel(s: &str) -> Option<ChannelKind> {
    match s {
        "email" => Some(ChannelKind::Email),
        "sms" => Some(ChannelKind::Sms),
        "voice" => Some(ChannelKind::Voice),
        "linkedin" => Some(ChannelKind::LinkedIn),
        "mail" => Some(ChannelKind::Mail),
        _ => None,
    }
}

async fn load_lead(db: &SqlitePool, id: LeadId) -> Result<Option<LeadPoolRecord>, sqlx::Error> {
    let row: Option<(String, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, Option<String>, String, bool, bool, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, email, phone, linkedin_url, first_name, last_name, title, \
                    provider_external_id, status, bounced, unsubscribed, created_at, updated_at \
             FROM lead_pool WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    Ok(row.and_then(
        |(id, email, phone, linkedin_url, first_name, last_name, title, provider_external_id, status, bounced, unsubscribed, created_at, updated_at)| {
            Some(LeadPoolRecord {
                id: id.parse().ok()?,
                identity: crate::types::lead::ContactIdentity {
                    email,
                    phone,
                    linkedin_url,
                    first_name,
                    last_name,
                    title,
                },
                firmographics: crate::types::lead::Firmographics::default(),
                provenance: crate::types::lead::EnrichmentProvenance::default(),
                email_status: None,
                status: if status == "enriched" {
                    crate::types::lead::LeadStatus::Enriched
                } else {
                    crate::types::lead::LeadStatus::New
                },
                provider_external_id,
                bounced,
                unsubscribed,
                created_at,
                updated_at,
                deleted_at: None,
            })
        },
    ))
}

async fn load_tenant(db: &SqlitePool, id: TenantId) -> Result<Option<Tenant>, sqlx::Error> {
    let row: Option<(String, String, String, String, i64, String, Option<String>, i64, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, display_name, tier, subscription_state, credits_remaining, \
                    permission_mode, webhook_url, webhook_failure_streak, \
                    onboarded_at, created_at, updated_at \
             FROM tenants WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    Ok(row.and_then(
        |(id, display_name, tier, subscription_state, credits_remaining, permission_mode, webhook_url, webhook_failure_streak, onboarded_at, created_at, updated_at)| {
            Some(Tenant {
                id: id.parse().ok()?,
                display_name,
                tier: parse_tier(&tier),
                subscription_state: parse_subscription_state(&subscription_state),
                credits_remaining,
                permission_mode: parse_permission_mode(&permission_mode),
                icp: crate::types::tenant::IcpVector::default(),
                webhook_url,
                #[allow(clippy::cast_sign_loss)]
                webhook_failure_streak: webhook_failure_streak.max(0) as u32,
                onboarded_at,
                created_at,
                updated_at,
                deleted_at: None,
            })
        },
    ))
}

fn parse_tier(s: &str) -> crate::types::tenant::TenantTier {
    use crate::types::tenant::TenantTier;
    match s {
        "growth" => TenantTier::Growth,
        "scale" => TenantTier::Scale,
        _ => TenantTier::Starter,
    }
}

fn parse_subscription_state(s: &str) -> SubscriptionState {
    match s {
        "past_due" => SubscriptionState::PastDue,
        "paused" => SubscriptionState::Paused,
        "cancelled" => SubscriptionState::Cancelled,
        "active" => SubscriptionState::Active,
        _ => SubscriptionState::Trialing,
    }
}

fn parse_permission_mode(s: &str) -> crate::types::tenant::PermissionMode {
    use crate::types::tenant::PermissionMode;
    match s {
        "co_pilot" => PermissionMode::CoPilot,
        "manual" => PermissionMode::Manual,
        _ => PermissionMode::Autopilot,
    }
}

async fn load_campaign(db: &SqlitePool, id: CampaignId) -> Result<Option<Campaign>, sqlx::Error> {
    let row: Option<(String, String, String, String, String, i64, String, DateTime<Utc>, DateTime<Utc>)> =
        sqlx::query_as(
            "SELECT id, tenant_id, name, status, permission_mode, lead_quota, sequence_json, \
                    created_at, updated_at \
             FROM campaigns WHERE id = ?1 AND deleted_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    Ok(row.and_then(
        |(id, tenant_id, name, status, permission_mode, lead_quota, sequence_json, created_at, updated_at)| {
            let sequence: Vec<crate::types::campaign::SequenceDefinitionStep> =
                serde_json::from_str(&sequence_json).unwrap_or_default();
            Some(Campaign {
                id: id.parse().ok()?,
                tenant_id: tenant_id.parse().ok()?,
                name,
                status: parse_campaign_status(&status),
                channel_allocation: Vec::new(),
                permission_mode: parse_permission_mode(&permission_mode),
                #[allow(clippy::cast_sign_loss)]
                lead_quota: lead_quota.max(0) as u32,
                sequence,
                send_window: crate::types::campaign::SendWindow::default(),
                created_at,
                updated_at,
                deleted_at: None,
            })
        },
    ))
}

fn parse_campaign_status(s: &str) -> CampaignStatus {
    match s {
        "active" => CampaignStatus::Active,
        "paused" => CampaignStatus::Paused,
        "completed" => CampaignStatus::Completed,
        _ => CampaignStatus::Draft,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::campaign::SendWindow;
    use chrono::NaiveDate;

    #[test]
    fn send_window_rejects_outside_business_hours() {
        let mut campaign = test_campaign();
        campaign.send_window = SendWindow::default();
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 2)
            .expect("valid date")
            .and_hms_opt(10, 0, 0)
            .expect("valid time");
        assert!(!Scheduler::in_send_window(&campaign, sunday));
    }

    #[test]
    fn send_window_accepts_weekday_business_hours() {
        let mut campaign = test_campaign();
        campaign.send_window = SendWindow::default();
        let tuesday = NaiveDate::from_ymd_opt(2026, 7, 28)
            .expect("valid date")
            .and_hms_opt(10, 0, 0)
            .expect("valid time");
        assert!(Scheduler::in_send_window(&campaign, tuesday));
    }

    fn test_campaign() -> Campaign {
        Campaign {
            id: crate::types::ids::CampaignId::new(),
            tenant_id: crate::types::ids::TenantId::new(),
            name: "test".to_owned(),
            status: CampaignStatus::Active,
            channel_allocation: vec![(ChannelKind::Email, 100)],
            permission_mode: crate::types::tenant::PermissionMode::Autopilot,
            lead_quota: 100,
            sequence: Vec::new(),
            send_window: SendWindow::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }
}
