//! Reply Router — classifies inbound messages and drives sequence control
//! (spec §4.10).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::channels::{ChannelDriver, ChannelKind, OutboundContent};
use crate::engines::resource_pool::ResourcePool;
use crate::engines::suppression::SuppressionIndex;
use crate::orchestration::scheduler::record_activity;
use crate::types::activity::ActivityAction;
use crate::types::conversation::ReplyIntent;
use crate::types::ids::{AssignmentId, LeadId, MessageId, TenantId, ThreadId};
use crate::types::suppression::{SuppressionKey, SuppressionReason, SuppressionScope};

/// Canonical inbound payload handed to the router by a channel webhook
/// adapter (spec §6.2).
#[derive(Debug, Clone)]
pub struct InboundPayload {
    pub tenant_id: Option<TenantId>,
    /// Email / phone / LinkedIn id — whichever the originating channel
    /// resolves the sender to (spec §6.2).
    pub lead_key: String,
    pub channel: ChannelKind,
    pub content: String,
    pub subject: Option<String>,
    pub thread_key: Option<String>,
    pub provider_msg_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Sequence-control action applied after classification (spec §4.10 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceAction {
    Pause,
    Continue,
    Stop,
    PauseUntil,
}

/// Data pulled out of the inbound body alongside the intent label.
#[derive(Debug, Clone, Default)]
pub struct ExtractedData {
    pub return_date: Option<DateTime<Utc>>,
    pub referral_contact: Option<String>,
}

/// Result of routing one inbound message.
#[derive(Debug)]
pub enum RouteOutcome {
    /// `provider_msg_id` already seen; ignored (spec §6.2).
    Duplicate,
    /// No lead pool record matches `lead_key`.
    LeadNotFound,
    Routed { intent: ReplyIntent, confidence: f64, action: SequenceAction },
}

/// Generates reply bodies for a classified inbound message. Concrete content
/// generation is delegated — this subsystem only stores and dispatches the
/// resulting artifact (spec §1 non-goals); the cheap/expensive split exists
/// so the lifetime cost cap (spec §4.10 step 6) has something to meter.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Estimated USD cost of one call, charged against the lifetime-per-lead
    /// cap regardless of actual provider billing.
    fn cost_usd(&self) -> f64;

    async fn generate(&self, inbound_body: &str, subject: Option<&str>) -> String;
}

/// Canned calendar-scheduling reply; free, never metered against the cost cap.
pub struct CalendarTemplateGenerator;

#[async_trait]
impl ReplyGenerator for CalendarTemplateGenerator {
    fn cost_usd(&self) -> f64 {
        0.0
    }

    async fn generate(&self, _inbound_body: &str, _subject: Option<&str>) -> String {
        "Thanks for the interest — here's my calendar link to grab a time that works: \
         [scheduling link]"
            .to_owned()
    }
}

/// Calls an external reply-generation SDK at a fixed per-call price; two
/// instances (cheap/expensive model tier) are wired up by the caller so the
/// lifetime cost cap (spec §4.10 step 6) has two price points to choose
/// between (spec §1 non-goals: content generation itself is delegated here).
pub struct SdkReplyGenerator {
    http: reqwest::Client,
    endpoint: String,
    cost_usd: f64,
}

impl SdkReplyGenerator {
    pub fn new(http: reqwest::Client, endpoint: String, cost_usd: f64) -> Self {
        Self { http, endpoint, cost_usd }
    }
}

#[async_trait]
impl ReplyGenerator for SdkReplyGenerator {
    fn cost_usd(&self) -> f64 {
        self.cost_usd
    }

    async fn generate(&self, inbound_body: &str, subject: Option<&str>) -> String {
        let payload = serde_json::json!({ "inbound_body": inbound_body, "subject": subject });
        let response = self.http.post(&self.endpoint).json(&payload).send().await;

        #[derive(serde::Deserialize)]
        struct GeneratedReply {
            body: String,
        }

        match response {
            Ok(resp) => match resp.json::<GeneratedReply>().await {
                Ok(reply) => reply.body,
                Err(err) => {
                    warn!(%err, "reply sdk returned an unparseable body");
                    "Thanks for your note — I'll follow up shortly.".to_owned()
                }
            },
            Err(err) => {
                warn!(%err, "reply sdk call failed");
                "Thanks for your note — I'll follow up shortly.".to_owned()
            }
        }
    }
}

/// The Reply Router (spec §4.10).
pub struct ReplyRouter {
    db: SqlitePool,
    suppression: SuppressionIndex,
    resource_pool: ResourcePool,
    drivers: Arc<HashMap<ChannelKind, Arc<dyn ChannelDriver>>>,
    calendar_template: Arc<dyn ReplyGenerator>,
    cheap_generator: Arc<dyn ReplyGenerator>,
    expensive_generator: Arc<dyn ReplyGenerator>,
    lifetime_cap_usd: f64,
}

impl ReplyRouter {
    pub fn new(
        db: SqlitePool,
        suppression: SuppressionIndex,
        resource_pool: ResourcePool,
        drivers: HashMap<ChannelKind, Arc<dyn ChannelDriver>>,
        cheap_generator: Arc<dyn ReplyGenerator>,
        expensive_generator: Arc<dyn ReplyGenerator>,
        lifetime_cap_usd: f64,
    ) -> Self {
        Self {
            db,
            suppression,
            resource_pool,
            drivers: Arc::new(drivers),
            calendar_template: Arc::new(CalendarTemplateGenerator),
            cheap_generator,
            expensive_generator,
            lifetime_cap_usd,
        }
    }

    /// Routes one inbound message end to end (spec §4.10 steps 1–6).
    ///
    /// `send_window_active` tells the router which response-delay band to
    /// use (spec §4.9: 3–5 min in-window, 10–15 min out-of-window); the
    /// caller determines this via [`crate::orchestration::scheduler::Scheduler::in_send_window`].
    ///
    /// # Errors
    ///
    /// Returns an error if a required database operation fails.
    pub async fn route(
        &self,
        payload: InboundPayload,
        send_window_active: bool,
    ) -> Result<RouteOutcome, sqlx::Error> {
        if self.already_seen(&payload.provider_msg_id).await? {
            return Ok(RouteOutcome::Duplicate);
        }

        let Some(lead_id) = self.resolve_lead(&payload.lead_key).await? else {
            return Ok(RouteOutcome::LeadNotFound);
        };

        let (intent, confidence, extracted) = classify_intent(&payload.content);

        let thread_id = self.find_or_create_thread(lead_id, payload.channel, &payload).await?;
        self.append_message(thread_id, &payload, Some(intent), Some(confidence)).await?;

        let Some((assignment_id, tenant_id)) = self.active_assignment(lead_id).await? else {
            warn!(%lead_id, "reply routed but no active assignment found");
            return Ok(RouteOutcome::Routed { intent, confidence, action: SequenceAction::Stop });
        };

        let action = self
            .apply_intent(intent, &extracted, lead_id, assignment_id, tenant_id, thread_id, &payload, send_window_active)
            .await?;

        Ok(RouteOutcome::Routed { intent, confidence, action })
    }

    async fn already_seen(&self, provider_msg_id: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM conversation_messages WHERE provider_msg_id = ?1 LIMIT 1",
        )
        .bind(provider_msg_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.is_some())
    }

    async fn resolve_lead(&self, lead_key: &str) -> Result<Option<LeadId>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM lead_pool \
             WHERE deleted_at IS NULL AND (email = ?1 OR phone = ?1 OR linkedin_url = ?1) \
             LIMIT 1",
        )
        .bind(lead_key)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.and_then(|(id,)| id.parse().ok()))
    }

    async fn find_or_create_thread(
        &self,
        lead_id: LeadId,
        channel: ChannelKind,
        payload: &InboundPayload,
    ) -> Result<ThreadId, sqlx::Error> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM conversation_threads WHERE lead_id = ?1 AND channel = ?2 LIMIT 1",
        )
        .bind(lead_id.to_string())
        .bind(channel.as_str())
        .fetch_optional(&self.db)
        .await?;

        if let Some((id,)) = existing {
            return Ok(id.parse().unwrap_or_default());
        }

        let id = ThreadId::new();
        let thread_ref = payload.thread_key.clone().unwrap_or_else(|| payload.lead_key.clone());
        sqlx::query(
            "INSERT INTO conversation_threads \
             (id, lead_id, channel, provider_thread_ref, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(id.to_string())
        .bind(lead_id.to_string())
        .bind(channel.as_str())
        .bind(thread_ref)
        .bind(payload.timestamp)
        .execute(&self.db)
        .await?;
        Ok(id)
    }

    async fn append_message(
        &self,
        thread_id: ThreadId,
        payload: &InboundPayload,
        intent: Option<ReplyIntent>,
        intent_confidence: Option<f64>,
    ) -> Result<MessageId, sqlx::Error> {
        let id = MessageId::new();
        sqlx::query(
            "INSERT INTO conversation_messages \
             (id, thread_id, direction, body, provider_msg_id, intent, intent_confidence, occurred_at) \
             VALUES (?1, ?2, 'inbound', ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id.to_string())
        .bind(thread_id.to_string())
        .bind(&payload.content)
        .bind(&payload.provider_msg_id)
        .bind(intent)
        .bind(intent_confidence)
        .bind(payload.timestamp)
        .execute(&self.db)
        .await?;
        Ok(id)
    }

    async fn active_assignment(
        &self,
        lead_id: LeadId,
    ) -> Result<Option<(AssignmentId, TenantId)>, sqlx::Error> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT id, tenant_id FROM assignments WHERE lead_id = ?1 AND deleted_at IS NULL LIMIT 1",
        )
        .bind(lead_id.to_string())
        .fetch_optional(&self.db)
        .await?;
        Ok(row.and_then(|(a, t)| Some((a.parse().ok()?, t.parse().ok()?))))
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_intent(
        &self,
        intent: ReplyIntent,
        extracted: &ExtractedData,
        lead_id: LeadId,
        assignment_id: AssignmentId,
        tenant_id: TenantId,
        thread_id: ThreadId,
        payload: &InboundPayload,
        send_window_active: bool,
    ) -> Result<SequenceAction, sqlx::Error> {
        match intent {
            ReplyIntent::MeetingInterest => {
                self.set_assignment_status(assignment_id, "replied", None).await?;
                self.queue_reply(thread_id, lead_id, assignment_id, tenant_id, payload, Arc::clone(&self.calendar_template), send_window_active).await?;
                Ok(SequenceAction::Pause)
            }
            ReplyIntent::Question => {
                self.set_assignment_status(assignment_id, "replied", None).await?;
                let generator = self.pick_question_generator(lead_id, &payload.content).await?;
                self.queue_reply(thread_id, lead_id, assignment_id, tenant_id, payload, generator, send_window_active).await?;
                Ok(SequenceAction::Pause)
            }
            ReplyIntent::PositiveEngagement => {
                let generator = Arc::clone(&self.cheap_generator);
                self.queue_reply(thread_id, lead_id, assignment_id, tenant_id, payload, generator, send_window_active).await?;
                Ok(SequenceAction::Continue)
            }
            ReplyIntent::NotInterested => {
                self.set_assignment_status(assignment_id, "not_interested", None).await?;
                if let Some(email) = email_from_key(&payload.lead_key) {
                    self.suppression
                        .suppress(Some(tenant_id), SuppressionScope::Tenant, SuppressionKey::Email, &email, SuppressionReason::DoNotContact)
                        .await?;
                }
                Ok(SequenceAction::Stop)
            }
            ReplyIntent::OutOfOffice => {
                let resume_at = extracted.return_date.unwrap_or_else(|| payload.timestamp + chrono::Duration::days(7));
                self.set_assignment_status(assignment_id, "in_sequence", Some(resume_at)).await?;
                Ok(SequenceAction::PauseUntil)
            }
            ReplyIntent::WrongPerson => {
                self.mark_lead_invalid(lead_id).await?;
                self.set_assignment_status(assignment_id, "archived", None).await?;
                Ok(SequenceAction::Stop)
            }
            ReplyIntent::Referral => {
                if let Some(contact) = &extracted.referral_contact {
                    self.create_referral_lead(tenant_id, contact).await?;
                }
                self.set_assignment_status(assignment_id, "archived", None).await?;
                Ok(SequenceAction::Stop)
            }
            ReplyIntent::AngryOrComplaint => {
                self.raise_operator_alert(tenant_id, lead_id, &payload.content).await?;
                self.set_assignment_status(assignment_id, "archived", None).await?;
                Ok(SequenceAction::Stop)
            }
        }
    }

    async fn pick_question_generator(
        &self,
        lead_id: LeadId,
        body: &str,
    ) -> Result<Arc<dyn ReplyGenerator>, sqlx::Error> {
        let is_complex = body.matches('?').count() > 1 || body.split_whitespace().count() > 40;
        if !is_complex {
            return Ok(Arc::clone(&self.cheap_generator));
        }
        let spent = self.lifetime_cost(lead_id).await?;
        if spent + self.expensive_generator.cost_usd() > self.lifetime_cap_usd {
            Ok(Arc::clone(&self.cheap_generator))
        } else {
            Ok(Arc::clone(&self.expensive_generator))
        }
    }

    async fn lifetime_cost(&self, lead_id: LeadId) -> Result<f64, sqlx::Error> {
        let row: (Option<f64>,) =
            sqlx::query_as("SELECT SUM(cost_usd) FROM reply_costs WHERE lead_id = ?1")
                .bind(lead_id.to_string())
                .fetch_one(&self.db)
                .await?;
        Ok(row.0.unwrap_or(0.0))
    }

    async fn record_cost(&self, lead_id: LeadId, cost_usd: f64, now: DateTime<Utc>) -> Result<(), sqlx::Error> {
        if cost_usd <= 0.0 {
            return Ok(());
        }
        sqlx::query("INSERT INTO reply_costs (lead_id, cost_usd, created_at) VALUES (?1, ?2, ?3)")
            .bind(lead_id.to_string())
            .bind(cost_usd)
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn set_assignment_status(
        &self,
        assignment_id: AssignmentId,
        status: &str,
        paused_until_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE assignments SET status = ?1, paused_until_at = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(status)
        .bind(paused_until_at)
        .bind(Utc::now())
        .bind(assignment_id.to_string())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn mark_lead_invalid(&self, lead_id: LeadId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE lead_pool SET bounced = 1, updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(lead_id.to_string())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn create_referral_lead(&self, tenant_id: TenantId, contact_email: &str) -> Result<(), sqlx::Error> {
        use crate::types::suppression::SuppressionKey as Key;
        if self
            .suppression
            .is_suppressed(tenant_id, Key::Email, contact_email)
            .await
            != crate::engines::suppression::SuppressionCheck::Clear
        {
            return Ok(());
        }
        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM lead_pool WHERE email = ?1 AND deleted_at IS NULL LIMIT 1")
                .bind(contact_email)
                .fetch_optional(&self.db)
                .await?;
        if exists.is_some() {
            return Ok(());
        }
        let id = LeadId::new();
        sqlx::query(
            "INSERT INTO lead_pool (id, email, status, bounced, unsubscribed, created_at, updated_at) \
             VALUES (?1, ?2, 'new', 0, 0, ?3, ?3)",
        )
        .bind(id.to_string())
        .bind(contact_email)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn raise_operator_alert(&self, tenant_id: TenantId, lead_id: LeadId, body: &str) -> Result<(), sqlx::Error> {
        error!(%tenant_id, %lead_id, "operator alert: angry_or_complaint reply received, no auto-reply sent");
        sqlx::query(
            "INSERT INTO operator_alerts (id, tenant_id, lead_id, kind, detail, created_at) \
             VALUES (?1, ?2, ?3, 'angry_or_complaint', ?4, ?5)",
        )
        .bind(crate::types::ids::ActivityId::new().to_string())
        .bind(tenant_id.to_string())
        .bind(lead_id.to_string())
        .bind(body)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    /// Generates a reply body and sends it after a randomized anti-bot
    /// delay (spec §4.9, §4.10 step 5), charging the generator's cost
    /// against the lead's lifetime cap.
    #[allow(clippy::too_many_arguments)]
    async fn queue_reply(
        &self,
        thread_id: ThreadId,
        lead_id: LeadId,
        assignment_id: AssignmentId,
        tenant_id: TenantId,
        payload: &InboundPayload,
        generator: Arc<dyn ReplyGenerator>,
        send_window_active: bool,
    ) -> Result<(), sqlx::Error> {
        let body = generator.generate(&payload.content, payload.subject.as_deref()).await;
        self.record_cost(lead_id, generator.cost_usd(), payload.timestamp).await?;

        let delay = response_delay(send_window_active);
        let db = self.db.clone();
        let resource_pool = self.resource_pool.clone();
        let drivers = Arc::clone(&self.drivers);
        let channel = payload.channel;
        let address = payload.lead_key.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let now = Utc::now();
            let Some((resource, _remaining)) = (match resource_pool.select_and_reserve(channel, tenant_id, now).await {
                Ok(r) => r,
                Err(err) => {
                    error!(%err, "reply dispatch: resource reservation failed");
                    return;
                }
            }) else {
                warn!(%tenant_id, channel = channel.as_str(), "reply dispatch: no resource available");
                return;
            };
            let Some(driver) = drivers.get(&channel) else {
                error!(channel = channel.as_str(), "reply dispatch: no driver registered");
                return;
            };
            let content = OutboundContent { subject: None, body, in_reply_to: None, personalization_refs: Vec::new() };
            match driver.send(&resource, &address, &content).await {
                Ok(crate::channels::SendOutcome::Ok { provider_msg_id }) => {
                    let _ = record_activity(
                        &db, tenant_id, lead_id, assignment_id, channel, ActivityAction::Sent,
                        Some(provider_msg_id), 0, None, now,
                    )
                    .await;
                    resource_pool.mark_used(resource.id, now).await;
                }
                Ok(_) | Err(_) => {
                    warn!(%lead_id, thread_id = %thread_id, "reply dispatch did not complete");
                }
            }
        });
        Ok(())
    }
}

fn email_from_key(lead_key: &str) -> Option<String> {
    lead_key.contains('@').then(|| lead_key.to_lowercase())
}

/// Randomized anti-bot response delay (spec §4.9): 3–5 minutes in-window,
/// 10–15 minutes out-of-window.
fn response_delay(send_window_active: bool) -> Duration {
    let mut rng = rand::thread_rng();
    let secs = if send_window_active { rng.gen_range(180..=300) } else { rng.gen_range(600..=900) };
    Duration::from_secs(secs)
}

/// Rule-based intent classifier (spec §4.10 step 3). A production system
/// would route this through a hosted classifier; this subsystem only stores
/// and dispatches generated content (spec §1 non-goals), so inbound
/// classification is kept to a deterministic keyword heuristic rather than
/// pulling in a model dependency.
fn classify_intent(body: &str) -> (ReplyIntent, f64, ExtractedData) {
    let lower = body.to_lowercase();

    if contains_any(&lower, &["fuck", "unacceptable", "furious", "scam", "lawsuit"]) {
        return (ReplyIntent::AngryOrComplaint, 0.9, ExtractedData::default());
    }
    if contains_any(&lower, &["wrong person", "not the right contact", "no longer works here", "left the company"]) {
        let referral = extract_referral_contact(&lower);
        if referral.is_some() {
            return (
                ReplyIntent::Referral,
                0.75,
                ExtractedData { referral_contact: referral, ..Default::default() },
            );
        }
        return (ReplyIntent::WrongPerson, 0.8, ExtractedData::default());
    }
    if contains_any(&lower, &["out of office", "ooo", "on vacation", "away from my desk", "annual leave"]) {
        return (ReplyIntent::OutOfOffice, 0.85, ExtractedData { return_date: None, ..Default::default() });
    }
    if contains_any(&lower, &["not interested", "please remove", "stop contacting", "unsubscribe", "no thanks"]) {
        return (ReplyIntent::NotInterested, 0.85, ExtractedData::default());
    }
    if contains_any(&lower, &["book a time", "calendar", "schedule a call", "happy to chat", "let's meet", "meeting"]) {
        return (ReplyIntent::MeetingInterest, 0.8, ExtractedData::default());
    }
    if lower.contains('?') {
        return (ReplyIntent::Question, 0.65, ExtractedData::default());
    }
    if contains_any(&lower, &["thanks", "interesting", "sounds good", "tell me more"]) {
        return (ReplyIntent::PositiveEngagement, 0.6, ExtractedData::default());
    }
    (ReplyIntent::PositiveEngagement, 0.3, ExtractedData::default())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn extract_referral_contact(lower: &str) -> Option<String> {
    lower
        .split_whitespace()
        .find(|tok| tok.contains('@'))
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '@' && c != '.').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_angry_complaint_over_everything_else() {
        let (intent, _, _) = classify_intent("This is unacceptable, remove me and don't contact again.");
        assert_eq!(intent, ReplyIntent::AngryOrComplaint);
    }

    #[test]
    fn classifies_out_of_office() {
        let (intent, _, _) = classify_intent("I'm currently out of office until next week.");
        assert_eq!(intent, ReplyIntent::OutOfOffice);
    }

    #[test]
    fn classifies_meeting_interest() {
        let (intent, _, _) = classify_intent("Happy to chat, let's book a time on your calendar.");
        assert_eq!(intent, ReplyIntent::MeetingInterest);
    }

    #[test]
    fn referral_extracts_contact_email() {
        let (intent, _, extracted) =
            classify_intent("I'm the wrong person for this, try jane@example.com instead.");
        assert_eq!(intent, ReplyIntent::Referral);
        assert_eq!(extracted.referral_contact.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn response_delay_respects_window_bounds() {
        let in_window = response_delay(true);
        assert!(in_window.as_secs() >= 180 && in_window.as_secs() <= 300);
        let out_of_window = response_delay(false);
        assert!(out_of_window.as_secs() >= 600 && out_of_window.as_secs() <= 900);
    }
}
