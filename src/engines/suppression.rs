//! Suppression Index — O(1)-ish membership test across global, tenant, and
//! domain scopes (spec §4.1).

use chrono::Utc;
use sqlx::SqlitePool;

use crate::types::ids::{SuppressionId, TenantId};
use crate::types::suppression::{SuppressionKey, SuppressionReason, SuppressionScope};

/// Result of a suppression lookup (spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressionCheck {
    /// No matching entry in any scope.
    Clear,
    /// Blocked, naming the scope and reason that matched.
    Blocked { scope: SuppressionScope, reason: SuppressionReason },
}

/// The Suppression Index (spec §4.1). Stateless beyond the pool: every call
/// is a direct query, since reads vastly outnumber writes and idempotent
/// upserts need no serialization beyond the unique index.
#[derive(Clone)]
pub struct SuppressionIndex {
    db: SqlitePool,
}

type SuppressionRow = (String, String);

impl SuppressionIndex {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Checks global, then tenant, then domain scope, in that order, first
    /// hit wins (spec §4.1). A query failure is treated as blocked — the
    /// caller should alert, never silently allow a send (spec §4.1 failure
    /// semantics).
    pub async fn is_suppressed(
        &self,
        tenant_id: TenantId,
        key: SuppressionKey,
        value: &str,
    ) -> SuppressionCheck {
        match self.lookup(None, key, value).await {
            Ok(Some(reason)) => {
                return SuppressionCheck::Blocked { scope: SuppressionScope::Global, reason };
            }
            Ok(None) => {}
            Err(_) => {
                return SuppressionCheck::Blocked {
                    scope: SuppressionScope::Global,
                    reason: SuppressionReason::DoNotContact,
                };
            }
        }

        match self.lookup(Some(tenant_id), key, value).await {
            Ok(Some(reason)) => {
                SuppressionCheck::Blocked { scope: SuppressionScope::Tenant, reason }
            }
            Ok(None) => SuppressionCheck::Clear,
            Err(_) => SuppressionCheck::Blocked {
                scope: SuppressionScope::Tenant,
                reason: SuppressionReason::DoNotContact,
            },
        }
    }

    async fn lookup(
        &self,
        tenant_id: Option<TenantId>,
        key: SuppressionKey,
        value: &str,
    ) -> Result<Option<SuppressionReason>, sqlx::Error> {
        let now = Utc::now();
        let row: Option<SuppressionRow> = match tenant_id {
            None => {
                sqlx::query_as(
                    "SELECT reason, key FROM suppression_entries \
                     WHERE scope = 'global' AND key = ?1 AND value = ?2 \
                     AND deleted_at IS NULL AND (expires_at IS NULL OR expires_at > ?3) \
                     LIMIT 1",
                )
                .bind(key_str(key))
                .bind(value)
                .bind(now)
                .fetch_optional(&self.db)
                .await?
            }
            Some(tid) => {
                sqlx::query_as(
                    "SELECT reason, key FROM suppression_entries \
                     WHERE tenant_id = ?1 AND scope IN ('tenant', 'domain') AND key = ?2 AND value = ?3 \
                     AND deleted_at IS NULL AND (expires_at IS NULL OR expires_at > ?4) \
                     LIMIT 1",
                )
                .bind(tid.to_string())
                .bind(key_str(key))
                .bind(value)
                .bind(now)
                .fetch_optional(&self.db)
                .await?
            }
        };

        Ok(row.map(|(reason, _)| parse_reason(&reason)))
    }

    /// Idempotent write (spec §4.1 "writes are idempotent on (scope, key)").
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails for a reason other than the
    /// idempotency conflict.
    pub async fn suppress(
        &self,
        tenant_id: Option<TenantId>,
        scope: SuppressionScope,
        key: SuppressionKey,
        value: &str,
        reason: SuppressionReason,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO suppression_entries (id, tenant_id, scope, key, value, reason) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(tenant_id, scope, key, value) WHERE deleted_at IS NULL DO NOTHING",
        )
        .bind(SuppressionId::new().to_string())
        .bind(tenant_id.map(|t| t.to_string()))
        .bind(scope_str(scope))
        .bind(key_str(key))
        .bind(value)
        .bind(reason_str(reason))
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

fn key_str(key: SuppressionKey) -> &'static str {
    match key {
        SuppressionKey::Email => "email",
        SuppressionKey::Domain => "domain",
        SuppressionKey::Phone => "phone",
    }
}

fn scope_str(scope: SuppressionScope) -> &'static str {
    match scope {
        SuppressionScope::Global => "global",
        SuppressionScope::Tenant => "tenant",
        SuppressionScope::Domain => "domain",
    }
}

fn reason_str(reason: SuppressionReason) -> &'static str {
    match reason {
        SuppressionReason::ExistingCustomer => "existing_customer",
        SuppressionReason::PastCustomer => "past_customer",
        SuppressionReason::Competitor => "competitor",
        SuppressionReason::Partner => "partner",
        SuppressionReason::DoNotContact => "do_not_contact",
        SuppressionReason::Bounced => "bounced",
        SuppressionReason::Unsubscribed => "unsubscribed",
        SuppressionReason::SpamComplaint => "spam_complaint",
    }
}

fn parse_reason(s: &str) -> SuppressionReason {
    match s {
        "existing_customer" => SuppressionReason::ExistingCustomer,
        "past_customer" => SuppressionReason::PastCustomer,
        "competitor" => SuppressionReason::Competitor,
        "partner" => SuppressionReason::Partner,
        "bounced" => SuppressionReason::Bounced,
        "unsubscribed" => SuppressionReason::Unsubscribed,
        "spam_complaint" => SuppressionReason::SpamComplaint,
        _ => SuppressionReason::DoNotContact,
    }
}
