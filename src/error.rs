//! Closed error taxonomy surfaced per-activity and per-job (spec §7).

use thiserror::Error;

/// JIT rejection sub-reasons (spec §4.8, §7). Each maps 1:1 onto an
/// `Activity { action: Rejected, reason: ... }` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JitRejectReason {
    SubscriptionInactive,
    NoCredits,
    CampaignInactive,
    ManualMode,
    BouncedGlobally,
    UnsubscribedGlobally,
    SuppressedGlobal,
    SuppressedTenant,
    SuppressedDomain,
    EmailInvalid,
    TooRecent,
    ChannelCooldown,
    WarmupNotReady,
    RateLimitChannel,
    AlsTooLow,
}

impl JitRejectReason {
    /// Stable snake_case tag persisted on the Activity row (spec §7).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SubscriptionInactive => "subscription_inactive",
            Self::NoCredits => "no_credits",
            Self::CampaignInactive => "campaign_inactive",
            Self::ManualMode => "manual_mode",
            Self::BouncedGlobally => "bounced_globally",
            Self::UnsubscribedGlobally => "unsubscribed_globally",
            Self::SuppressedGlobal => "suppressed_global",
            Self::SuppressedTenant => "suppressed_tenant",
            Self::SuppressedDomain => "suppressed_domain",
            Self::EmailInvalid => "email_invalid",
            Self::TooRecent => "too_recent",
            Self::ChannelCooldown => "channel_cooldown",
            Self::WarmupNotReady => "warmup_not_ready",
            Self::RateLimitChannel => "rate_limit_channel",
            Self::AlsTooLow => "als_too_low",
        }
    }
}

impl std::fmt::Display for JitRejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed dispatch-time error taxonomy (spec §7). Each variant maps to a
/// documented handling strategy; callers match on this to decide whether to
/// retry, record a terminal activity, or escalate.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Blocked before dispatch by the JIT validator; not retried this run.
    #[error("rejected by jit: {0}")]
    RejectedJit(JitRejectReason),

    /// SMS blocked by a do-not-call registry check inside the driver.
    #[error("rejected by do-not-call registry")]
    RejectedDncr,

    /// Retryable provider failure (5xx, timeout). The rate reserve is
    /// released; caller retries with exponential backoff.
    #[error("transient provider error: {0}")]
    TransientProviderError(String),

    /// Non-retryable provider failure (4xx, invalid address).
    #[error("permanent provider error: {0}")]
    PermanentProviderError(String),

    /// A required field was missing at the point enrichment tried to persist.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A batch or per-lead budget cap was hit; caller downgrades tier or
    /// defers.
    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    /// An internal invariant was violated. Escalated to the operator alert
    /// channel; aborts only the current assignment, never the scheduler.
    #[error("fatal invariant violation: {0}")]
    Fatal(String),

    /// Storage-layer failure underneath any of the above.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DispatchError {
    /// Whether the caller should retry this attempt later in the same run
    /// (spec §7: only transient provider errors are locally recovered).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientProviderError(_))
    }
}
