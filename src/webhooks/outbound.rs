//! Outbound webhook push — meeting_booked notifications to tenant-configured
//! endpoints (spec §6.3). Call [`push_meeting_booked`] from a spawned task so
//! a slow or dead tenant endpoint never blocks Meeting creation.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::types::campaign::Campaign;
use crate::types::downstream::Meeting;
use crate::types::ids::{MeetingId, TenantId};
use crate::types::lead::{ContactIdentity, Firmographics};
use crate::types::tenant::Tenant;

/// Consecutive failures before an endpoint is considered degraded (spec §6.3).
pub const DEGRADED_AFTER_FAILURES: u32 = 5;

/// Builds and sends the `meeting_booked` webhook body (spec §6.3), logs the
/// attempt to `webhook_push_log`, and updates the tenant's failure streak.
/// A `None` `webhook_url` is a silent no-op — not every tenant wants the push.
///
/// # Errors
///
/// Returns an error only if the push-log write or streak update itself
/// fails; HTTP failures against the tenant's endpoint are recorded, never
/// propagated to the caller.
pub async fn push_meeting_booked(
    db: &SqlitePool,
    http: &reqwest::Client,
    tenant: &Tenant,
    meeting: &Meeting,
    identity: &ContactIdentity,
    firmographics: &Firmographics,
    campaign: &Campaign,
) -> Result<(), sqlx::Error> {
    let Some(url) = tenant.webhook_url.as_deref() else {
        return Ok(());
    };

    let name = format!(
        "{} {}",
        identity.first_name.clone().unwrap_or_default(),
        identity.last_name.clone().unwrap_or_default()
    );
    let body = serde_json::json!({
        "event": "meeting_booked",
        "timestamp": Utc::now().to_rfc3339(),
        "lead": {
            "name": name.trim(),
            "email": identity.email,
            "phone": identity.phone,
            "company": firmographics.company_name,
            "title": identity.title,
            "linkedin_url": identity.linkedin_url,
        },
        "meeting": {
            "id": meeting.id.to_string(),
            "scheduled_at": meeting.scheduled_at.to_rfc3339(),
            "duration_minutes": meeting.duration_minutes,
            "meeting_type": meeting.meeting_type,
            "meeting_link": meeting.meeting_link,
        },
        "campaign": {
            "id": campaign.id.to_string(),
            "name": campaign.name,
        },
    });

    let outcome = http.post(url).json(&body).send().await;
    let (success, detail) = match outcome {
        Ok(resp) if resp.status().is_success() => (true, None),
        Ok(resp) => (false, Some(format!("http {}", resp.status()))),
        Err(err) => (false, Some(err.to_string())),
    };

    record_push(db, tenant.id, meeting.id, success, detail.as_deref()).await?;

    if success {
        reset_failure_streak(db, tenant.id).await?;
    } else {
        let streak = bump_failure_streak(db, tenant.id).await?;
        if streak >= DEGRADED_AFTER_FAILURES {
            error!(tenant = %tenant.id, streak, "outbound webhook endpoint marked degraded");
        } else {
            warn!(tenant = %tenant.id, streak, detail, "outbound webhook push failed");
        }
    }

    Ok(())
}

async fn record_push(
    db: &SqlitePool,
    tenant_id: TenantId,
    meeting_id: MeetingId,
    success: bool,
    detail: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO webhook_push_log (id, tenant_id, meeting_id, success, detail, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(uuid::Uuid::now_v7().to_string())
    .bind(tenant_id.to_string())
    .bind(meeting_id.to_string())
    .bind(success)
    .bind(detail)
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(())
}

async fn reset_failure_streak(db: &SqlitePool, tenant_id: TenantId) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE tenants SET webhook_failure_streak = 0, updated_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(tenant_id.to_string())
        .execute(db)
        .await?;
    Ok(())
}

async fn bump_failure_streak(db: &SqlitePool, tenant_id: TenantId) -> Result<u32, sqlx::Error> {
    sqlx::query(
        "UPDATE tenants SET webhook_failure_streak = webhook_failure_streak + 1, updated_at = ?1 \
         WHERE id = ?2",
    )
    .bind(Utc::now())
    .bind(tenant_id.to_string())
    .execute(db)
    .await?;

    let row: (i64,) = sqlx::query_as("SELECT webhook_failure_streak FROM tenants WHERE id = ?1")
        .bind(tenant_id.to_string())
        .fetch_one(db)
        .await?;
    #[allow(clippy::cast_sign_loss)]
    Ok(row.0.max(0) as u32)
}
