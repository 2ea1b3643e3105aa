//! External enrichment providers feeding the Waterfall (spec §4.5).

pub mod premium;
pub mod primary;
pub mod supplement;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::lead::{ContactIdentity, Firmographics};

/// A partial fill returned by one provider tier; the Waterfall merges these,
/// never overwriting a higher-confidence value already present (spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct EnrichmentFill {
    pub identity: ContactIdentity,
    pub firmographics: Firmographics,
    pub confidence: f64,
}

/// Errors a provider call can raise; every tier failure falls through to the
/// next tier (spec §4.5).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out")]
    Timeout,
    #[error("provider transport error: {0}")]
    Transport(String),
    #[error("provider returned no match")]
    NoMatch,
}

/// One tier of the Enrichment Waterfall (spec §4.5).
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    /// Looks up by email, falling back to LinkedIn URL, falling back to
    /// (name, company domain) — the lookup order spec §4.5 mandates for the
    /// primary tier; other tiers use whichever identifiers they have.
    async fn lookup(&self, partial: &ContactIdentity) -> Result<EnrichmentFill, ProviderError>;
}
